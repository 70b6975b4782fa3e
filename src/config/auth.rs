use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::auth::password;

/// HTTP Basic authentication for the SCIM endpoints.
///
/// ```toml
/// [auth]
/// realm = "SCIM"
///
/// [[auth.users]]
/// username = "okta"
/// password_hash = "{SSHA256}..."   # scimserver hash-password <password>
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Require credentials on `/scim/v2`. Disable only behind another
    /// authenticating proxy.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Realm sent in `WWW-Authenticate` challenges.
    #[serde(default = "default_realm")]
    pub realm: String,

    /// Accepted credentials.
    #[serde(default)]
    pub users: Vec<BasicAuthUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            realm: default_realm(),
            users: Vec::new(),
        }
    }
}

/// One accepted username and its salted password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthUser {
    pub username: String,
    pub password_hash: String,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.users.is_empty() {
            return Err(ConfigError::Validation(
                "auth.enabled requires at least one entry in auth.users".into(),
            ));
        }
        for user in &self.users {
            if user.username.is_empty() || user.username.contains(':') {
                return Err(ConfigError::Validation(format!(
                    "Invalid auth username '{}': must be non-empty and contain no ':'",
                    user.username
                )));
            }
            if !password::is_valid_hash(&user.password_hash) {
                return Err(ConfigError::Validation(format!(
                    "Invalid password_hash for auth user '{}': expected {}<base64>",
                    user.username,
                    password::SSHA256_PREFIX
                )));
            }
        }
        Ok(())
    }

    /// Check a username/password pair against the configured users.
    pub fn verify(&self, username: &str, candidate: &str) -> bool {
        self.users
            .iter()
            .find(|u| u.username == username)
            .is_some_and(|u| password::verify_password(candidate, &u.password_hash))
    }
}

fn default_true() -> bool {
    true
}

fn default_realm() -> String {
    "SCIM".to_string()
}
