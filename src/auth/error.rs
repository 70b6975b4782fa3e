use thiserror::Error;

use crate::scim::ScimErrorResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No Basic credentials provided
    #[error("Authentication required")]
    MissingCredentials,

    /// Authorization header present but not decodable
    #[error("Malformed Basic credentials")]
    MalformedCredentials,

    /// Unknown user or wrong password (generic to prevent enumeration)
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl From<AuthError> for ScimErrorResponse {
    fn from(e: AuthError) -> Self {
        ScimErrorResponse::unauthorized(e.to_string())
    }
}
