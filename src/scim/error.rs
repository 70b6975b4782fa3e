//! Error bodies in the `urn:ietf:params:scim:api:messages:2.0:Error` shape
//! (RFC 7644 §3.12).

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::types::{SCHEMA_ERROR, SCIM_CONTENT_TYPE};

pub type ScimResult<T> = Result<T, ScimErrorResponse>;

/// `scimType` values this server emits. Each one implies its HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    InvalidFilter,
    InvalidSyntax,
    /// Write to `id` or another read-only attribute.
    Mutability,
    /// Duplicate `userName` or `displayName`.
    Uniqueness,
    InvalidValue,
}

impl ScimErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFilter => "invalidFilter",
            Self::InvalidSyntax => "invalidSyntax",
            Self::Mutability => "mutability",
            Self::Uniqueness => "uniqueness",
            Self::InvalidValue => "invalidValue",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::Uniqueness => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body. `status` is the HTTP code as a string, as the protocol
/// requires; [`status_code`](Self::status_code) parses it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimErrorResponse {
    pub schemas: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,
    pub detail: String,
}

impl ScimErrorResponse {
    /// Error with no `scimType`.
    pub fn with_status(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            schemas: vec![SCHEMA_ERROR.to_string()],
            status: status.as_u16().to_string(),
            scim_type: None,
            detail: detail.into(),
        }
    }

    /// Error carrying `kind` and the status it implies.
    pub fn typed(kind: ScimErrorType, detail: impl Into<String>) -> Self {
        Self {
            scim_type: Some(kind),
            ..Self::with_status(kind.status(), detail)
        }
    }

    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::typed(ScimErrorType::InvalidFilter, detail)
    }

    /// Body is not JSON, or not the expected JSON shape.
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::typed(ScimErrorType::InvalidSyntax, detail)
    }

    pub fn mutability(detail: impl Into<String>) -> Self {
        Self::typed(ScimErrorType::Mutability, detail)
    }

    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::typed(ScimErrorType::InvalidValue, detail)
    }

    pub fn uniqueness(detail: impl Into<String>) -> Self {
        Self::typed(ScimErrorType::Uniqueness, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// Falls back to 500 if `status` was overwritten with something unparseable.
    pub fn status_code(&self) -> StatusCode {
        self.status
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ScimErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scim_type {
            Some(kind) => write!(f, "{} {}: {}", self.status, kind, self.detail),
            None => write!(f, "{}: {}", self.status, self.detail),
        }
    }
}

impl IntoResponse for ScimErrorResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(SCIM_CONTENT_TYPE),
        );
        response
    }
}
