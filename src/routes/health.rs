//! Health check endpoints for container probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentStatus>,
}

/// Status of a single component.
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

/// Liveness probe. Succeeds whenever the process can serve requests.
///
/// `GET /health`
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        database: None,
    })
}

/// Readiness probe. Checks that the database answers a trivial query.
///
/// `GET /health/ready`
#[tracing::instrument(name = "health.readiness", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let start = std::time::Instant::now();
    let result = state.db.health_check().await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let healthy = result.is_ok();
    if let Err(e) = &result {
        tracing::warn!(error = %e, "Readiness check failed: database unavailable");
    }

    let health = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        database: Some(ComponentStatus {
            healthy,
            message: result.err().map(|e| e.to_string()),
            latency_ms,
        }),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::scim::test_support::test_app;

    #[tokio::test]
    async fn test_health_endpoints_need_no_auth() {
        let app = test_app().await;

        for uri in ["/health", "/health/ready"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);

            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["status"], "healthy");
        }
    }
}
