use async_trait::async_trait;
use uuid::Uuid;

use super::ListWindow;
use crate::{
    db::error::DbResult,
    models::{AttributeValue, CreateUser, User, UserAttribute, UserFilter},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user and its group memberships in a single transaction.
    ///
    /// Fails with `Conflict` when the userName is taken and with
    /// `MissingReference` when a referenced group does not exist.
    async fn create(&self, input: CreateUser) -> DbResult<User>;

    /// Get a user by its ID.
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>>;

    /// List users in creation order, optionally restricted to those matching
    /// an equality filter.
    async fn list(&self, filter: Option<&UserFilter>, window: ListWindow) -> DbResult<Vec<User>>;

    /// Overwrite all base attributes and replace the user's memberships with
    /// exactly `input.group_ids`, in a single transaction.
    async fn replace(&self, id: Uuid, input: CreateUser) -> DbResult<User>;

    /// Set one attribute. Returns `NotFound` when the user does not exist.
    async fn update_attribute(
        &self,
        id: Uuid,
        attribute: UserAttribute,
        value: AttributeValue,
    ) -> DbResult<User>;
}
