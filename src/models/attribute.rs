//! Attribute allow-lists for filtering and partial updates.
//!
//! Only the attributes enumerated here can appear in a list filter or a PATCH
//! replace. Each variant owns its column name, so column identifiers in SQL
//! never come from request text. Matching is case-insensitive, which lets
//! `userName`, `username` and `USERNAME` all resolve to the same attribute.

use std::{fmt, str::FromStr};

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown attribute '{0}'")]
pub struct UnknownAttribute(pub String);

/// Why a value could not be assigned to an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeValueError {
    #[error("Attribute '{0}' is immutable")]
    Immutable(&'static str),

    #[error("Attribute '{0}' cannot be null")]
    Required(&'static str),

    #[error("Attribute '{0}' must be a single value")]
    NotScalar(&'static str),
}

/// Storage shape of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Id,
    Boolean,
    Text { required: bool },
}

/// Common behavior of the per-resource attribute enums.
pub trait ResourceAttribute: Copy + fmt::Debug + fmt::Display + Send + Sync {
    /// Column holding this attribute.
    fn column(self) -> &'static str;

    fn kind(self) -> AttributeKind;

    /// Canonical SCIM attribute name.
    fn scim_name(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAttribute {
    Id,
    Active,
    UserName,
    GivenName,
    MiddleName,
    FamilyName,
    Email,
}

impl UserAttribute {
    pub const ALL: [UserAttribute; 7] = [
        UserAttribute::Id,
        UserAttribute::Active,
        UserAttribute::UserName,
        UserAttribute::GivenName,
        UserAttribute::MiddleName,
        UserAttribute::FamilyName,
        UserAttribute::Email,
    ];
}

impl ResourceAttribute for UserAttribute {
    fn column(self) -> &'static str {
        match self {
            UserAttribute::Id => "id",
            UserAttribute::Active => "active",
            UserAttribute::UserName => "user_name",
            UserAttribute::GivenName => "given_name",
            UserAttribute::MiddleName => "middle_name",
            UserAttribute::FamilyName => "family_name",
            UserAttribute::Email => "email",
        }
    }

    fn kind(self) -> AttributeKind {
        match self {
            UserAttribute::Id => AttributeKind::Id,
            UserAttribute::Active => AttributeKind::Boolean,
            UserAttribute::UserName => AttributeKind::Text { required: true },
            _ => AttributeKind::Text { required: false },
        }
    }

    fn scim_name(self) -> &'static str {
        match self {
            UserAttribute::Id => "id",
            UserAttribute::Active => "active",
            UserAttribute::UserName => "userName",
            UserAttribute::GivenName => "givenName",
            UserAttribute::MiddleName => "middleName",
            UserAttribute::FamilyName => "familyName",
            UserAttribute::Email => "email",
        }
    }
}

impl FromStr for UserAttribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(UserAttribute::Id),
            "active" => Ok(UserAttribute::Active),
            "username" => Ok(UserAttribute::UserName),
            "givenname" => Ok(UserAttribute::GivenName),
            "middlename" => Ok(UserAttribute::MiddleName),
            "familyname" => Ok(UserAttribute::FamilyName),
            "email" => Ok(UserAttribute::Email),
            _ => Err(UnknownAttribute(s.trim().to_string())),
        }
    }
}

impl fmt::Display for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scim_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAttribute {
    Id,
    DisplayName,
}

impl ResourceAttribute for GroupAttribute {
    fn column(self) -> &'static str {
        match self {
            GroupAttribute::Id => "id",
            GroupAttribute::DisplayName => "display_name",
        }
    }

    fn kind(self) -> AttributeKind {
        match self {
            GroupAttribute::Id => AttributeKind::Id,
            GroupAttribute::DisplayName => AttributeKind::Text { required: true },
        }
    }

    fn scim_name(self) -> &'static str {
        match self {
            GroupAttribute::Id => "id",
            GroupAttribute::DisplayName => "displayName",
        }
    }
}

impl FromStr for GroupAttribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(GroupAttribute::Id),
            "displayname" => Ok(GroupAttribute::DisplayName),
            _ => Err(UnknownAttribute(s.trim().to_string())),
        }
    }
}

impl fmt::Display for GroupAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scim_name())
    }
}

/// A typed value ready to be bound to an attribute's column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Id(Uuid),
    Bool(bool),
    Text(Option<String>),
}

impl AttributeValue {
    /// Coerce a JSON value from a PATCH body for assignment to `attribute`.
    pub fn from_json<A: ResourceAttribute>(
        attribute: A,
        value: &Value,
    ) -> Result<Self, AttributeValueError> {
        match attribute.kind() {
            AttributeKind::Id => Err(AttributeValueError::Immutable(attribute.scim_name())),
            AttributeKind::Boolean => Ok(AttributeValue::Bool(is_truthy(value))),
            AttributeKind::Text { required } => match value {
                Value::Null if required => {
                    Err(AttributeValueError::Required(attribute.scim_name()))
                }
                Value::Null => Ok(AttributeValue::Text(None)),
                Value::String(s) => Ok(AttributeValue::Text(Some(s.clone()))),
                Value::Number(n) => Ok(AttributeValue::Text(Some(n.to_string()))),
                Value::Bool(b) => Ok(AttributeValue::Text(Some(b.to_string()))),
                Value::Array(_) | Value::Object(_) => {
                    Err(AttributeValueError::NotScalar(attribute.scim_name()))
                }
            },
        }
    }

    /// Coerce a filter operand.
    ///
    /// Returns `None` when the operand cannot equal any stored value, such as
    /// a malformed id.
    pub fn from_filter<A: ResourceAttribute>(attribute: A, raw: &str) -> Option<Self> {
        match attribute.kind() {
            AttributeKind::Id => Uuid::parse_str(raw).ok().map(AttributeValue::Id),
            AttributeKind::Boolean => Some(AttributeValue::Bool(is_truthy_str(raw))),
            AttributeKind::Text { .. } => Some(AttributeValue::Text(Some(raw.to_string()))),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Id(id) => write!(f, "{}", id),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Text(Some(s)) => f.write_str(s),
            AttributeValue::Text(None) => f.write_str("null"),
        }
    }
}

/// Equality predicate on a single allow-listed attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter<A> {
    pub attribute: A,
    pub value: AttributeValue,
}

pub type UserFilter = AttributeFilter<UserAttribute>;
pub type GroupFilter = AttributeFilter<GroupAttribute>;

/// `true`, `1`, `"1"` and `"true"` are true; everything else is false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => is_truthy_str(s),
        _ => false,
    }
}

fn is_truthy_str(s: &str) -> bool {
    let s = s.trim();
    s == "1" || s.eq_ignore_ascii_case("true")
}
