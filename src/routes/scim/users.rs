//! SCIM 2.0 User Resource Endpoints
//!
//! - GET /Users: List users, optionally filtered by one `eq` predicate
//! - POST /Users: Create user
//! - GET /Users/{id}: Get user by ID
//! - PUT /Users/{id}: Replace user
//! - PATCH /Users/{id}: Partial update, including group membership

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
        PatchRequest, ScimErrorResponse, ScimListParams, ScimListResponse, ScimResult, ScimUser,
        parse_user_input, render_list, render_user,
    },
};

fn users_url(state: &AppState, headers: &HeaderMap) -> String {
    format!("{}/Users", base_url(&state.config.server, headers))
}

/// `GET /scim/v2/Users`
///
/// Query parameters:
/// - `filter`: `<attribute> eq <value>` (e.g., `userName eq "jdoe"`)
/// - `startIndex`: 1-based pagination start (default: 1)
/// - `count`: Results per page (default and maximum: `scim.max_results`)
#[tracing::instrument(name = "scim.users.list", skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ScimListParams>, QueryRejection>,
) -> ScimResult<ScimJson<ScimListResponse<ScimUser>>> {
    let params = list_params(query)?;
    let page = state.services.provisioning.list_users(&params).await?;

    let collection = users_url(&state, &headers);
    Ok(ScimJson::ok(render_list(
        &page.resources,
        page.start_index,
        &collection,
        |user, location| render_user(user, location),
        |user| user.user.id,
    )))
}

/// `POST /scim/v2/Users`
///
/// Returns 201 Created with the stored user, or 409 when `userName` is taken.
#[tracing::instrument(name = "scim.users.create", skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimUser>> {
    let input = parse_user_input(&json_body(body)?)?;
    let created = state.services.provisioning.create_user(input).await?;

    let location = format!("{}/{}", users_url(&state, &headers), created.user.id);
    Ok(ScimJson::created(render_user(&created, location)))
}

/// `GET /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.get", skip_all, fields(%id))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<ScimUser>> {
    let user = state.services.provisioning.get_user(&id).await?;

    let location = format!("{}/{}", users_url(&state, &headers), user.user.id);
    Ok(ScimJson::ok(render_user(&user, location)))
}

/// `PUT /scim/v2/Users/{id}`
///
/// Every mutable attribute is overwritten; `groups` replaces the user's
/// memberships.
#[tracing::instrument(name = "scim.users.replace", skip_all, fields(%id))]
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimUser>> {
    let input = parse_user_input(&json_body(body)?)?;
    let user = state.services.provisioning.replace_user(&id, input).await?;

    let location = format!("{}/{}", users_url(&state, &headers), user.user.id);
    Ok(ScimJson::ok(render_user(&user, location)))
}

/// `PATCH /scim/v2/Users/{id}`
#[tracing::instrument(name = "scim.users.patch", skip_all, fields(%id))]
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ScimResult<ScimJson<ScimUser>> {
    let request: PatchRequest = serde_json::from_value(json_body(body)?)
        .map_err(|e| ScimErrorResponse::invalid_syntax(format!("Invalid PatchOp: {}", e)))?;
    let user = state.services.patch.patch_user(&id, request).await?;

    let location = format!("{}/{}", users_url(&state, &headers), user.user.id);
    Ok(ScimJson::ok(render_user(&user, location)))
}
