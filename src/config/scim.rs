use serde::{Deserialize, Serialize};

use super::ConfigError;

/// SCIM protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScimConfig {
    /// Largest page a list request returns; also the default `count`.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// `documentationUri` advertised in the ServiceProviderConfig.
    #[serde(default)]
    pub documentation_uri: Option<String>,
}

impl Default for ScimConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            documentation_uri: None,
        }
    }
}

impl ScimConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(ConfigError::Validation(
                "scim.max_results must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_results() -> u32 {
    1000
}
