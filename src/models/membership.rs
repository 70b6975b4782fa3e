use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One edge of the user/group relation, joined with the display values of
/// both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    /// The group's displayName.
    pub group_display: String,
    /// "givenName familyName" of the user, or the userName when both are empty.
    pub user_display: String,
}

/// Reference to a related resource as it appears in `groups` and `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub value: String,
    #[serde(rename = "$ref")]
    pub ref_uri: String,
    pub display: String,
}

impl MemberRef {
    /// Reference to a group, as listed in a user's `groups`.
    pub fn group(id: Uuid, display: impl Into<String>) -> Self {
        Self {
            value: id.to_string(),
            ref_uri: format!("../Groups/{}", id),
            display: display.into(),
        }
    }

    /// Reference to a user, as listed in a group's `members`.
    pub fn user(id: Uuid, display: impl Into<String>) -> Self {
        Self {
            value: id.to_string(),
            ref_uri: format!("../Users/{}", id),
            display: display.into(),
        }
    }
}
