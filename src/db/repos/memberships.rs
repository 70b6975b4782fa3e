use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::Membership};

/// Storage for the user/group relation.
///
/// This is the only place memberships are written; the `groups` of a user and
/// the `members` of a group are both derived from it.
#[async_trait]
pub trait MembershipRepo: Send + Sync {
    /// Add a user to a group. Adding an existing membership is a no-op.
    async fn add(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()>;

    /// Remove a user from a group. Removing an absent membership is a no-op.
    async fn remove(&self, user_id: Uuid, group_id: Uuid) -> DbResult<()>;

    /// Every membership joined with both display values.
    async fn list_all(&self) -> DbResult<Vec<Membership>>;

    /// Memberships of a single user.
    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<Membership>>;

    /// Memberships of a single group.
    async fn list_for_group(&self, group_id: Uuid) -> DbResult<Vec<Membership>>;
}
