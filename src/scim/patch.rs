//! SCIM 2.0 PATCH request model
//!
//! Parsing is deliberately loose: `op` is any string and `value` any JSON, so
//! requests using operations this server does not implement still deserialize
//! and can be answered per operation instead of rejecting the whole body.
//!
//! ```json
//! {
//!   "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!   "Operations": [
//!     { "op": "replace", "value": { "displayName": "New Name" } },
//!     { "op": "add", "path": "members", "value": [{ "value": "<user id>" }] },
//!     { "op": "remove", "path": "members[value eq \"<user id>\"]" }
//!   ]
//! }
//! ```

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::SCHEMA_PATCH_OP;

static VALUE_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?i:(members|groups))\[\s*(?i:value)\s+(?i:eq)\s+"([^"]*)"\s*\]$"#)
        .expect("Invalid path regex")
});

/// A SCIM PATCH request containing one or more operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(rename = "Operations", alias = "operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![SCHEMA_PATCH_OP.to_string()],
            operations,
        }
    }
}

/// A single `{op, path, value}` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    #[serde(default)]
    pub op: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn new(op: impl Into<String>, path: Option<&str>, value: Option<Value>) -> Self {
        Self {
            op: op.into(),
            path: path.map(str::to_string),
            value,
        }
    }

    pub fn kind(&self) -> PatchOpKind {
        match self.op.trim().to_ascii_lowercase().as_str() {
            "add" => PatchOpKind::Add,
            "replace" => PatchOpKind::Replace,
            "remove" => PatchOpKind::Remove,
            _ => PatchOpKind::Unsupported,
        }
    }

    /// The parsed path; a missing or blank path is `None`.
    pub fn target(&self) -> Option<PatchPath> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(parse_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOpKind {
    Add,
    Replace,
    Remove,
    Unsupported,
}

/// Multi-valued reference attribute addressed by a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceList {
    /// A group's `members`.
    Members,
    /// A user's `groups`.
    Groups,
}

impl fmt::Display for ReferenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceList::Members => f.write_str("members"),
            ReferenceList::Groups => f.write_str("groups"),
        }
    }
}

/// The subset of PATCH path syntax this server acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchPath {
    /// `members` or `groups`.
    List(ReferenceList),
    /// `members[value eq "<id>"]` or `groups[value eq "<id>"]`.
    Entry(ReferenceList, String),
    /// Any other path, such as a simple attribute name.
    Attribute(String),
}

pub fn parse_path(input: &str) -> PatchPath {
    let input = input.trim();

    if let Some(captures) = VALUE_SELECTOR.captures(input) {
        return PatchPath::Entry(reference_list(&captures[1]), captures[2].to_string());
    }

    if input.eq_ignore_ascii_case("members") || input.eq_ignore_ascii_case("groups") {
        return PatchPath::List(reference_list(input));
    }

    PatchPath::Attribute(input.to_string())
}

fn reference_list(name: &str) -> ReferenceList {
    if name.eq_ignore_ascii_case("members") {
        ReferenceList::Members
    } else {
        ReferenceList::Groups
    }
}
