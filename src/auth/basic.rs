use axum::http::{HeaderMap, header};
use base64::Engine;

use super::AuthError;

/// Username and password from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)?;

        let (scheme, encoded) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MalformedCredentials)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(AuthError::MissingCredentials);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::MalformedCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(user_pass: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(user_pass)
        )
    }

    #[test]
    fn test_parse_basic_credentials() {
        let creds = BasicCredentials::from_headers(&headers(&basic("admin:s3:cret"))).unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "s3:cret");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let value = basic("admin:secret").replace("Basic", "basic");
        assert!(BasicCredentials::from_headers(&headers(&value)).is_ok());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            BasicCredentials::from_headers(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            BasicCredentials::from_headers(&headers("Bearer abc")),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            BasicCredentials::from_headers(&headers("Basic !!!")),
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            BasicCredentials::from_headers(&headers(&basic("no-colon"))),
            Err(AuthError::MalformedCredentials)
        ));
    }
}
