use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::MemberRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inbound group model, used for both POST and PUT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    /// Users that should be members once the write completes.
    pub member_ids: Vec<Uuid>,
}

/// A group together with its derived members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResource {
    pub group: Group,
    pub members: Vec<MemberRef>,
}
