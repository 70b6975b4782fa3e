//! Configuration module for the SCIM server.
//!
//! The server is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8081
//!
//! [database]
//! type = "sqlite"
//! path = "scim.db"
//!
//! [[auth.users]]
//! username = "okta"
//! password_hash = "${SCIM_PASSWORD_HASH}"
//! ```

mod auth;
mod database;
mod observability;
mod scim;
mod server;

use std::{path::Path, sync::LazyLock};

pub use auth::*;
pub use database::*;
pub use observability::*;
pub use scim::*;
use serde::{Deserialize, Serialize};
pub use server::*;

static ENV_VAR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

/// Root configuration.
///
/// All sections are optional with defaults, though a usable server needs at
/// least `[database]` and either `[[auth.users]]` or `auth.enabled = false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScimServerConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage for users, groups and memberships.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP Basic authentication for the SCIM endpoints.
    #[serde(default)]
    pub auth: AuthConfig,

    /// SCIM protocol settings.
    #[serde(default)]
    pub scim: ScimConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl ScimServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let mut config: ScimServerConfig =
            toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.server.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate()?;
        self.scim.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR}` references, leaving anything after a `#` comment untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in ENV_VAR.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };
            if comment_pos.is_some_and(|pos| whole.start() >= pos) {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::auth::password::hash_password;

    fn with_user(extra: &str) -> String {
        format!(
            r#"
            [[auth.users]]
            username = "okta"
            password_hash = "{}"
            {}
            "#,
            hash_password("secret"),
            extra
        )
    }

    #[test]
    #[serial]
    fn test_minimal_config() {
        temp_env::with_var_unset("PORT", || {
            let config = ScimServerConfig::from_str(&with_user("")).unwrap();

            assert_eq!(config.server.port, 8081);
            assert_eq!(config.scim.max_results, 1000);
            assert!(config.auth.enabled);
            assert_eq!(config.auth.realm, "SCIM");
            assert!(config.auth.verify("okta", "secret"));
            assert!(!config.auth.verify("okta", "wrong"));
            assert!(!config.auth.verify("other", "secret"));
            assert!(config.database.is_none());
        });
    }

    #[test]
    #[serial]
    fn test_port_env_override() {
        temp_env::with_var("PORT", Some("9000"), || {
            let config = ScimServerConfig::from_str(&with_user("")).unwrap();
            assert_eq!(config.server.port, 9000);
        });
        temp_env::with_var("PORT", Some("not-a-port"), || {
            assert!(ScimServerConfig::from_str(&with_user("")).is_err());
        });
    }

    #[test]
    #[serial]
    fn test_auth_required_without_users() {
        temp_env::with_var_unset("PORT", || {
            let err = ScimServerConfig::from_str("").unwrap_err();
            assert!(err.to_string().contains("auth.users"));

            let config = ScimServerConfig::from_str("[auth]\nenabled = false").unwrap();
            assert!(!config.auth.enabled);
        });
    }

    #[test]
    #[serial]
    fn test_invalid_password_hash_rejected() {
        temp_env::with_var_unset("PORT", || {
            let err = ScimServerConfig::from_str(
                r#"
                [[auth.users]]
                username = "okta"
                password_hash = "plaintext"
                "#,
            )
            .unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ScimServerConfig::from_str("[server]\nprot = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[cfg(feature = "database-sqlite")]
    #[test]
    #[serial]
    fn test_sqlite_database_config() {
        temp_env::with_var_unset("PORT", || {
            let config = ScimServerConfig::from_str(&with_user(
                r#"
                [database]
                type = "sqlite"
                path = "scim.db"
                "#,
            ))
            .unwrap();
            match &config.database {
                DatabaseConfig::Sqlite(c) => {
                    assert_eq!(c.path, "scim.db");
                    assert!(c.wal_mode);
                    assert_eq!(c.busy_timeout_ms, 5000);
                }
                other => panic!("expected sqlite config, got {:?}", other),
            }
            assert!(config.database.run_migrations());
        });
    }

    #[test]
    #[serial]
    fn test_scim_and_logging_sections() {
        temp_env::with_var_unset("PORT", || {
            let config = ScimServerConfig::from_str(&with_user(
                r#"
                [scim]
                max_results = 50

                [observability.logging]
                level = "debug"
                format = "json"
                directives = ["scimserver=trace"]
                "#,
            ))
            .unwrap();
            assert_eq!(config.scim.max_results, 50);
            assert_eq!(config.observability.logging.level, LogLevel::Debug);
            assert_eq!(config.observability.logging.format, LogFormat::Json);
            assert_eq!(
                config.observability.logging.directives,
                vec!["scimserver=trace".to_string()]
            );
        });
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_SCIM_PATH", Some("/data/scim.db"), || {
            let result = expand_env_vars("path = \"${TEST_SCIM_PATH}\"").unwrap();
            assert_eq!(result, "path = \"/data/scim.db\"");
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# path = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# path = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_missing_env_var() {
        let err = expand_env_vars("url = \"${SCIM_DEFINITELY_UNSET_VAR}\"").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "SCIM_DEFINITELY_UNSET_VAR"));
    }

    #[test]
    fn test_multiline_keeps_trailing_newline() {
        temp_env::with_var("TEST_MULTI", Some("value1"), || {
            let input = "a = \"${TEST_MULTI}\"\nb = 2\n";
            assert_eq!(expand_env_vars(input).unwrap(), "a = \"value1\"\nb = 2\n");
        });
    }
}
