//! SCIM 2.0 provisioning server for Users and Groups.
//!
//! Identity providers push users, groups and group memberships over the SCIM
//! protocol (RFC 7643/7644); this crate stores them in SQLite or PostgreSQL
//! and serves them back in SCIM form.

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, http::HeaderName, routing::get};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod scim;
pub mod services;

/// Header carrying the per-request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::ScimServerConfig>,
    pub db: Arc<db::DbPool>,
    pub services: services::Services,
    pub discovery: Arc<routes::DiscoveryDocuments>,
}

impl AppState {
    pub fn new(db: Arc<db::DbPool>, config: Arc<config::ScimServerConfig>) -> Self {
        Self {
            services: services::Services::new(db.clone(), config.scim.max_results),
            discovery: Arc::new(routes::DiscoveryDocuments::new(&config.scim)),
            db,
            config,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(routes::health::liveness))
        .route("/health/ready", get(routes::health::readiness))
        .nest(routes::SCIM_PREFIX, routes::scim_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
