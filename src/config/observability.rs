use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Targets that are noisy at `info` and are capped unless overridden.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "h2=warn", "sqlx=warn", "tower=info"];

/// `[observability]` section. Only logging is configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ObservabilityConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()
    }
}

/// `[observability.logging]`
///
/// ```toml
/// [observability.logging]
/// level = "debug"
/// format = "json"
/// directives = ["scimserver=trace", "sqlx=info"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_true")]
    pub timestamps: bool,

    /// Emit `file:line` of each event.
    #[serde(default)]
    pub source_location: bool,

    /// Attach the enclosing request span to JSON events.
    #[serde(default = "default_true")]
    pub include_spans: bool,

    /// Extra `EnvFilter` directives (`target=level`), applied after `level`.
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            timestamps: true,
            source_location: false,
            include_spans: true,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Filter string for the subscriber: the base level, the quiet-target
    /// caps, then configured directives (later directives win per target).
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(QUIET_TARGETS.iter().copied())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self
            .directives
            .iter()
            .find(|d| d.trim().is_empty() || d.contains(','))
        {
            return Err(ConfigError::Validation(format!(
                "observability.logging.directives entries must be single non-empty directives, got '{}'",
                bad
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for local development.
    Pretty,
    #[default]
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_directives() {
        let config = LoggingConfig::default();
        assert_eq!(
            config.filter_directives(),
            "info,hyper=warn,h2=warn,sqlx=warn,tower=info"
        );
    }

    #[test]
    fn test_configured_directives_come_last() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            directives: vec!["sqlx=info".into()],
            ..Default::default()
        };
        let filter = config.filter_directives();
        assert!(filter.starts_with("debug,"));
        assert!(filter.ends_with(",sqlx=info"));
    }

    #[test]
    fn test_blank_or_joined_directives_rejected() {
        for bad in ["", "  ", "a=info,b=debug"] {
            let config = LoggingConfig {
                directives: vec![bad.into()],
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{:?}", bad);
        }
    }
}
