//! SCIM 2.0 HTTP endpoints (RFC 7644).
//!
//! All routes are mounted under `/scim/v2` and guarded by HTTP Basic
//! authentication. Responses use the `application/scim+json` content type.

mod discovery;
mod groups;
mod middleware;
mod users;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::rejection::{BytesRejection, QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
pub use discovery::DiscoveryDocuments;
use serde::Serialize;
use serde_json::Value;

use crate::{
    AppState,
    config::ServerConfig,
    scim::{SCIM_CONTENT_TYPE, ScimErrorResponse, ScimListParams, ScimResult},
};

/// Path prefix of every SCIM endpoint.
pub const SCIM_PREFIX: &str = "/scim/v2";

pub fn scim_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        // Discovery
        .route(
            "/ServiceProviderConfig",
            get(discovery::service_provider_config),
        )
        .route("/ResourceTypes", get(discovery::resource_types))
        .route("/ResourceTypes/{id}", get(discovery::resource_type))
        .route("/Schemas", get(discovery::schemas))
        .route("/Schemas/{id}", get(discovery::schema))
        // Users
        .route("/Users", get(users::list_users).post(users::create_user))
        .route(
            "/Users/{id}",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user),
        )
        // Groups
        .route("/Groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/Groups/{id}",
            get(groups::get_group)
                .put(groups::replace_group)
                .patch(groups::patch_group),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::scim_auth_middleware,
        ))
}

#[tracing::instrument(name = "scim.root")]
async fn root() -> &'static str {
    "SCIM"
}

/// SCIM JSON response with the `application/scim+json` content type.
pub struct ScimJson<T> {
    body: T,
    status: StatusCode,
}

impl<T: Serialize> ScimJson<T> {
    pub fn ok(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
        }
    }

    pub fn created(body: T) -> Self {
        Self {
            body,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ScimJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.body) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, SCIM_CONTENT_TYPE)],
                Body::from(body),
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize SCIM response");
                ScimErrorResponse::internal("Failed to serialize response").into_response()
            }
        }
    }
}

/// Base URL of the SCIM API as seen by the client.
///
/// `server.public_url` wins; otherwise `X-Forwarded-Proto`/`X-Forwarded-Host`
/// and then `Host` are used.
pub(crate) fn base_url(server: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(public_url) = &server.public_url {
        return format!("{}{}", public_url.trim_end_matches('/'), SCIM_PREFIX);
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}{}", scheme, host, SCIM_PREFIX)
}

/// Decode a request body as JSON.
///
/// The body is read as raw bytes so clients that omit or vary the
/// `Content-Type` header are still accepted.
pub(crate) fn json_body(body: Result<Bytes, BytesRejection>) -> ScimResult<Value> {
    let bytes = body.map_err(|rejection| {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ScimErrorResponse::with_status(status, rejection.body_text())
        } else {
            ScimErrorResponse::invalid_syntax(rejection.body_text())
        }
    })?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ScimErrorResponse::invalid_syntax(format!("Invalid JSON: {}", e)))
}

pub(crate) fn list_params(
    query: Result<axum::extract::Query<ScimListParams>, QueryRejection>,
) -> ScimResult<ScimListParams> {
    query
        .map(|axum::extract::Query(params)| params)
        .map_err(|rejection| ScimErrorResponse::bad_request(rejection.body_text()))
}
