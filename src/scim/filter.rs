//! SCIM 2.0 Filter Parser
//!
//! Only a single equality predicate is supported:
//!
//! ```text
//! filter    = attrName SP "eq" SP compValue
//! compValue = DQUOTE *(CHAR except DQUOTE) DQUOTE / 1*(NON-SPACE except DQUOTE)
//! ```
//!
//! The operator is matched case-insensitively. Attribute names are resolved
//! against the per-resource allow-lists in [`crate::models`], also
//! case-insensitively. Anything else (other operators, logical expressions,
//! grouping) is rejected as an invalid filter.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::models::{AttributeFilter, AttributeValue, ResourceAttribute};

/// Maximum allowed length of a SCIM filter expression (bytes).
pub const MAX_FILTER_LENGTH: usize = 4096;

/// The operand must end the expression, so a trailing `and`/`or` clause
/// never matches.
static EQ_FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*(\S+)\s+(?i:eq)\s+(?:"([^"]*)"|([^\s"]+))\s*$"#)
        .expect("Invalid filter regex")
});

/// A parsed `attribute eq value` predicate, not yet resolved to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityFilter {
    pub attribute: String,
    pub value: String,
}

impl EqualityFilter {
    /// Resolve the attribute against a resource's allow-list.
    ///
    /// `Ok(None)` means the predicate is well-formed but no stored value can
    /// satisfy it (for example a malformed id), so the result set is empty.
    pub fn resolve<A>(&self) -> Result<Option<AttributeFilter<A>>, A::Err>
    where
        A: ResourceAttribute + FromStr,
    {
        let attribute: A = self.attribute.parse()?;
        Ok(AttributeValue::from_filter(attribute, &self.value)
            .map(|value| AttributeFilter { attribute, value }))
    }
}

impl fmt::Display for EqualityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} eq \"{}\"", self.attribute, self.value)
    }
}

/// Error returned for filters outside the supported grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParseError {
    pub message: String,
}

impl FilterParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FilterParseError {}

/// Parse a SCIM filter expression.
///
/// # Examples
///
/// ```
/// use scimserver::scim::filter::parse_filter;
///
/// let filter = parse_filter(r#"userName eq "bjensen""#).unwrap();
/// assert_eq!(filter.attribute, "userName");
/// assert_eq!(filter.value, "bjensen");
/// ```
pub fn parse_filter(input: &str) -> Result<EqualityFilter, FilterParseError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterParseError::new(format!(
            "Filter exceeds maximum length of {} bytes",
            MAX_FILTER_LENGTH
        )));
    }

    let captures = EQ_FILTER.captures(input).ok_or_else(|| {
        FilterParseError::new(format!(
            "Unsupported filter '{}'; expected: <attribute> eq <value>",
            input.trim()
        ))
    })?;

    let attribute = captures[1].to_string();
    let value = captures
        .get(2)
        .or_else(|| captures.get(3))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    Ok(EqualityFilter { attribute, value })
}
