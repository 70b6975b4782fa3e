use async_trait::async_trait;
use uuid::Uuid;

use super::ListWindow;
use crate::{
    db::error::DbResult,
    models::{AttributeValue, CreateGroup, Group, GroupAttribute, GroupFilter},
};

#[async_trait]
pub trait GroupRepo: Send + Sync {
    /// Create a group and its memberships in a single transaction.
    ///
    /// Fails with `Conflict` when the displayName is taken and with
    /// `MissingReference` when a referenced user does not exist.
    async fn create(&self, input: CreateGroup) -> DbResult<Group>;

    /// Get a group by its ID.
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>>;

    /// List groups in creation order, optionally filtered.
    async fn list(&self, filter: Option<&GroupFilter>, window: ListWindow)
    -> DbResult<Vec<Group>>;

    /// Overwrite the displayName and replace the member set with exactly
    /// `input.member_ids`, in a single transaction.
    async fn replace(&self, id: Uuid, input: CreateGroup) -> DbResult<Group>;

    /// Set one attribute. Returns `NotFound` when the group does not exist.
    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: GroupAttribute,
        value: AttributeValue,
    ) -> DbResult<Group>;
}
