//! SCIM 2.0 Group Resource Endpoints
//!
//! - GET /Groups: List groups, optionally filtered by one `eq` predicate
//! - POST /Groups: Create group
//! - GET /Groups/{id}: Get group by ID
//! - PUT /Groups/{id}: Replace group
//! - PATCH /Groups/{id}: Rename or add/remove members

use axum::{
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{BytesRejection, QueryRejection},
    },
    http::HeaderMap,
};

use super::{ScimJson, base_url, json_body, list_params};
use crate::{
    AppState,
    scim::{
        PatchRequest, ScimErrorResponse, ScimGroup, ScimListParams, ScimListResponse, ScimResult,
        parse_group_input, render_group, render_list,
    },
};

fn groups_url(state: &AppState, headers: &HeaderMap) -> String {
    format!("{}/Groups", base_url(&state.config.server, headers))
}

/// `GET /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.list", skip_all)]
pub async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ScimListParams>, QueryRejection>,
) -> ScimResult<ScimJson<ScimListResponse<ScimGroup>>> {
    let params = list_params(query)?;
    let page = state.services.provisioning.list_groups(&params).await?;

    let collection = groups_url(&state, &headers);
    Ok(ScimJson::ok(render_list(
        &page.resources,
        page.start_index,
        &collection,
        |group, location| render_group(group, location),
        |group| group.group.id,
    )))
}

/// `POST /scim/v2/Groups`
#[tracing::instrument(name = "scim.groups.create", skip_all)]
pub async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimGroup>> {
    let input = parse_group_input(&json_body(body)?)?;
    let created = state.services.provisioning.create_group(input).await?;

    let location = format!("{}/{}", groups_url(&state, &headers), created.group.id);
    Ok(ScimJson::created(render_group(&created, location)))
}

/// `GET /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.get", skip_all, fields(%id))]
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<ScimGroup>> {
    let group = state.services.provisioning.get_group(&id).await?;

    let location = format!("{}/{}", groups_url(&state, &headers), group.group.id);
    Ok(ScimJson::ok(render_group(&group, location)))
}

/// `PUT /scim/v2/Groups/{id}`
///
/// `members` replaces the group's membership list.
#[tracing::instrument(name = "scim.groups.replace", skip_all, fields(%id))]
pub async fn replace_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimGroup>> {
    let input = parse_group_input(&json_body(body)?)?;
    let group = state.services.provisioning.replace_group(&id, input).await?;

    let location = format!("{}/{}", groups_url(&state, &headers), group.group.id);
    Ok(ScimJson::ok(render_group(&group, location)))
}

/// `PATCH /scim/v2/Groups/{id}`
#[tracing::instrument(name = "scim.groups.patch", skip_all, fields(%id))]
pub async fn patch_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimGroup>> {
    let request: PatchRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ScimErrorResponse::invalid_syntax(format!("Invalid PatchOp: {}", e)))?;
    let group = state.services.patch.patch_group(&id, request).await?;

    let location = format!("{}/{}", groups_url(&state, &headers), group.group.id);
    Ok(ScimJson::ok(render_group(&group, location)))
}
