use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::MemberRef;

/// A provisioned user as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub active: bool,
    pub user_name: String,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Display value used when this user appears in a group's `members`.
    ///
    /// Given and family name joined by a space; falls back to the userName
    /// when neither is set.
    pub fn display_name(&self) -> String {
        member_display(
            self.given_name.as_deref(),
            self.family_name.as_deref(),
            &self.user_name,
        )
    }
}

pub fn member_display(given: Option<&str>, family: Option<&str>, user_name: &str) -> String {
    let joined = format!("{} {}", given.unwrap_or_default(), family.unwrap_or_default());
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        user_name.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Inbound user model, used for both POST and PUT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct CreateUser {
    pub active: bool,
    #[validate(length(min = 1, max = 255))]
    pub user_name: String,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
    #[validate(length(max = 320))]
    pub email: Option<String>,
    /// Groups this user should belong to once the write completes.
    pub group_ids: Vec<Uuid>,
}

/// A user together with its derived group memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserResource {
    pub user: User,
    pub groups: Vec<MemberRef>,
}
