//! SCIM HTTP Basic Authentication Middleware
//!
//! Identity providers authenticate with a static username and password
//! configured under `[[auth.users]]`. Passwords are stored as salted hashes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    auth::{AuthError, BasicCredentials},
    scim::ScimErrorResponse,
};

/// Basic authentication middleware for every `/scim/v2` route.
///
/// Rejections are SCIM error bodies with a `WWW-Authenticate` challenge.
/// Authentication is skipped entirely when `auth.enabled = false`.
pub async fn scim_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    if !auth.enabled {
        return next.run(request).await;
    }

    let credentials = match BasicCredentials::from_headers(request.headers()) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::debug!(error = %e, "SCIM authentication failed");
            return challenge(&auth.realm, e);
        }
    };

    if !auth.verify(&credentials.username, &credentials.password) {
        tracing::warn!(
            username = %credentials.username,
            "SCIM authentication failed: invalid credentials"
        );
        return challenge(&auth.realm, AuthError::InvalidCredentials);
    }

    tracing::debug!(username = %credentials.username, "SCIM client authenticated");
    next.run(request).await
}

fn challenge(realm: &str, error: AuthError) -> Response {
    let mut response = ScimErrorResponse::from(error).into_response();
    let value = format!("Basic realm=\"{}\"", realm.replace('"', ""));
    if let Ok(value) = HeaderValue::from_str(&value) {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
