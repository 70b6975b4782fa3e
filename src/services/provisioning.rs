//! SCIM User and Group provisioning.
//!
//! Reads and writes Users and Groups through the repositories and attaches
//! the derived `groups`/`members` views from a [`MembershipIndex`]. Each
//! request costs at most one membership query, whatever the page size.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::MembershipIndex;
use crate::{
    db::{DbError, DbPool, ListWindow},
    models::{
        AttributeValue, AttributeValueError, CreateGroup, CreateUser, Group, GroupAttribute,
        GroupResource, User, UserAttribute, UserResource,
    },
    scim::{ScimErrorResponse, ScimListParams, parse_filter},
};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidFilter(String),

    #[error("Invalid filter attribute '{0}'")]
    InvalidFilterAttribute(String),

    #[error("Invalid attribute '{0}'")]
    InvalidAttribute(String),

    #[error("{0}")]
    Immutable(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error("Operation Not Supported")]
    OperationNotSupported,

    #[error("{0}")]
    Storage(String),
}

impl From<DbError> for ProvisioningError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => ProvisioningError::Conflict(msg),
            DbError::MissingReference(msg) => ProvisioningError::NotFound(msg),
            other => ProvisioningError::Storage(other.to_string()),
        }
    }
}

impl From<AttributeValueError> for ProvisioningError {
    fn from(e: AttributeValueError) -> Self {
        match e {
            AttributeValueError::Immutable(_) => ProvisioningError::Immutable(e.to_string()),
            _ => ProvisioningError::InvalidValue(e.to_string()),
        }
    }
}

impl From<ProvisioningError> for ScimErrorResponse {
    fn from(e: ProvisioningError) -> Self {
        let detail = e.to_string();
        match e {
            ProvisioningError::NotFound(_) => ScimErrorResponse::not_found(detail),
            ProvisioningError::Conflict(_) => ScimErrorResponse::uniqueness(detail),
            ProvisioningError::InvalidFilter(_)
            | ProvisioningError::InvalidFilterAttribute(_) => {
                ScimErrorResponse::invalid_filter(detail)
            }
            ProvisioningError::InvalidAttribute(_) => ScimErrorResponse::bad_request(detail),
            ProvisioningError::Immutable(_) => ScimErrorResponse::mutability(detail),
            ProvisioningError::InvalidValue(_) => ScimErrorResponse::invalid_value(detail),
            ProvisioningError::OperationNotSupported => ScimErrorResponse::forbidden(detail),
            ProvisioningError::Storage(_) => ScimErrorResponse::internal(detail),
        }
    }
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// One page of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePage<T> {
    pub resources: Vec<T>,
    /// 1-based index of the first resource, after clamping.
    pub start_index: u32,
}

impl<T> ResourcePage<T> {
    fn empty(start_index: u32) -> Self {
        Self {
            resources: Vec::new(),
            start_index,
        }
    }
}

#[derive(Clone)]
pub struct ProvisioningService {
    db: Arc<DbPool>,
    max_results: u32,
}

impl ProvisioningService {
    pub fn new(db: Arc<DbPool>, max_results: u32) -> Self {
        Self { db, max_results }
    }

    /// Largest page a list request may return.
    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    /// Translate SCIM paging parameters into a storage window.
    ///
    /// `startIndex` below 1 is treated as 1. `count` defaults to and is capped
    /// at `max_results`; a negative count yields an empty page.
    pub fn page_window(&self, params: &ScimListParams) -> (u32, ListWindow) {
        let start = params
            .start_index
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX));
        let max = i64::from(self.max_results);
        let count = params.count.unwrap_or(max).clamp(0, max);
        // `start` is within u32 range after the clamp above
        let start_index = u32::try_from(start).unwrap_or(u32::MAX);
        (start_index, ListWindow::new(start - 1, count))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    #[tracing::instrument(skip(self))]
    pub async fn list_users(
        &self,
        params: &ScimListParams,
    ) -> ProvisioningResult<ResourcePage<UserResource>> {
        let (start_index, window) = self.page_window(params);

        let filter = match params.filter.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let parsed =
                    parse_filter(raw).map_err(|e| ProvisioningError::InvalidFilter(e.message))?;
                match parsed
                    .resolve::<UserAttribute>()
                    .map_err(|e| ProvisioningError::InvalidFilterAttribute(e.0))?
                {
                    Some(filter) => Some(filter),
                    None => return Ok(ResourcePage::empty(start_index)),
                }
            }
            _ => None,
        };

        let users = self.db.users().list(filter.as_ref(), window).await?;
        debug!(count = users.len(), "Listed users");

        let index = self.index_for(!users.is_empty()).await?;
        let resources = users
            .into_iter()
            .map(|user| UserResource {
                groups: index.groups_for_user(user.id),
                user,
            })
            .collect();

        Ok(ResourcePage {
            resources,
            start_index,
        })
    }

    pub async fn get_user(&self, id: &str) -> ProvisioningResult<UserResource> {
        let user_id = parse_id(id, "User")?;
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))?;
        self.hydrate_user(user).await
    }

    #[tracing::instrument(skip(self, input), fields(user_name = %input.user_name))]
    pub async fn create_user(&self, input: CreateUser) -> ProvisioningResult<UserResource> {
        let user = self.db.users().create(input).await?;
        info!(user_id = %user.id, "Provisioned user");
        self.hydrate_user(user).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn replace_user(
        &self,
        id: &str,
        input: CreateUser,
    ) -> ProvisioningResult<UserResource> {
        let user_id = parse_id(id, "User")?;
        let user = self
            .db
            .users()
            .replace(user_id, input)
            .await
            .map_err(|e| not_found_as(e, || user_not_found(user_id)))?;
        info!(user_id = %user.id, "Replaced user");
        self.hydrate_user(user).await
    }

    /// Assign a single allow-listed attribute, as PATCH replace does.
    pub async fn patch_user_attribute(
        &self,
        user_id: Uuid,
        attribute: &str,
        value: &Value,
    ) -> ProvisioningResult<UserResource> {
        let attribute: UserAttribute = attribute
            .parse()
            .map_err(|_| ProvisioningError::InvalidAttribute(attribute.to_string()))?;
        let value = AttributeValue::from_json(attribute, value)?;

        debug!(%user_id, %attribute, "Patching user attribute");
        let user = self
            .db
            .users()
            .update_attribute(user_id, attribute, value)
            .await
            .map_err(|e| not_found_as(e, || user_not_found(user_id)))?;
        self.hydrate_user(user).await
    }

    async fn hydrate_user(&self, user: User) -> ProvisioningResult<UserResource> {
        let memberships = self.db.memberships().list_for_user(user.id).await?;
        let index = MembershipIndex::new(memberships);
        Ok(UserResource {
            groups: index.groups_for_user(user.id),
            user,
        })
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    #[tracing::instrument(skip(self))]
    pub async fn list_groups(
        &self,
        params: &ScimListParams,
    ) -> ProvisioningResult<ResourcePage<GroupResource>> {
        let (start_index, window) = self.page_window(params);

        let filter = match params.filter.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let parsed =
                    parse_filter(raw).map_err(|e| ProvisioningError::InvalidFilter(e.message))?;
                match parsed
                    .resolve::<GroupAttribute>()
                    .map_err(|e| ProvisioningError::InvalidFilterAttribute(e.0))?
                {
                    Some(filter) => Some(filter),
                    None => return Ok(ResourcePage::empty(start_index)),
                }
            }
            _ => None,
        };

        let groups = self.db.groups().list(filter.as_ref(), window).await?;
        debug!(count = groups.len(), "Listed groups");

        let index = self.index_for(!groups.is_empty()).await?;
        let resources = groups
            .into_iter()
            .map(|group| GroupResource {
                members: index.users_for_group(group.id),
                group,
            })
            .collect();

        Ok(ResourcePage {
            resources,
            start_index,
        })
    }

    pub async fn get_group(&self, id: &str) -> ProvisioningResult<GroupResource> {
        let group_id = parse_id(id, "Group")?;
        let group = self
            .db
            .groups()
            .get_by_id(group_id)
            .await?
            .ok_or_else(|| group_not_found(group_id))?;
        self.hydrate_group(group).await
    }

    #[tracing::instrument(skip(self, input), fields(display_name = %input.display_name))]
    pub async fn create_group(&self, input: CreateGroup) -> ProvisioningResult<GroupResource> {
        let group = self.db.groups().create(input).await?;
        info!(group_id = %group.id, "Provisioned group");
        self.hydrate_group(group).await
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn replace_group(
        &self,
        id: &str,
        input: CreateGroup,
    ) -> ProvisioningResult<GroupResource> {
        let group_id = parse_id(id, "Group")?;
        let group = self
            .db
            .groups()
            .replace(group_id, input)
            .await
            .map_err(|e| not_found_as(e, || group_not_found(group_id)))?;
        info!(group_id = %group.id, "Replaced group");
        self.hydrate_group(group).await
    }

    /// Assign a single allow-listed attribute, as PATCH replace does.
    pub async fn patch_group_attribute(
        &self,
        group_id: Uuid,
        attribute: &str,
        value: &Value,
    ) -> ProvisioningResult<GroupResource> {
        let attribute: GroupAttribute = attribute
            .parse()
            .map_err(|_| ProvisioningError::InvalidAttribute(attribute.to_string()))?;
        let value = AttributeValue::from_json(attribute, value)?;

        debug!(%group_id, %attribute, "Patching group attribute");
        let group = self
            .db
            .groups()
            .update_attribute(group_id, attribute, value)
            .await
            .map_err(|e| not_found_as(e, || group_not_found(group_id)))?;
        self.hydrate_group(group).await
    }

    async fn hydrate_group(&self, group: Group) -> ProvisioningResult<GroupResource> {
        let memberships = self.db.memberships().list_for_group(group.id).await?;
        let index = MembershipIndex::new(memberships);
        Ok(GroupResource {
            members: index.users_for_group(group.id),
            group,
        })
    }

    // ------------------------------------------------------------------
    // Memberships
    // ------------------------------------------------------------------

    /// Idempotent. Fails with `NotFound` naming whichever side is missing.
    pub async fn add_membership(&self, user_id: Uuid, group_id: Uuid) -> ProvisioningResult<()> {
        self.db.memberships().add(user_id, group_id).await?;
        debug!(%user_id, %group_id, "Added membership");
        Ok(())
    }

    /// Idempotent. Removing an absent membership succeeds.
    pub async fn remove_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> ProvisioningResult<()> {
        self.db.memberships().remove(user_id, group_id).await?;
        debug!(%user_id, %group_id, "Removed membership");
        Ok(())
    }

    async fn index_for(&self, needed: bool) -> ProvisioningResult<MembershipIndex> {
        if !needed {
            return Ok(MembershipIndex::default());
        }
        Ok(MembershipIndex::new(
            self.db.memberships().list_all().await?,
        ))
    }
}

/// Ids are UUIDs; any other string cannot name a stored resource.
pub(crate) fn parse_id(raw: &str, resource: &str) -> ProvisioningResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ProvisioningError::NotFound(format!("{} {} not found", resource, raw)))
}

fn user_not_found(id: Uuid) -> ProvisioningError {
    ProvisioningError::NotFound(format!("User {} not found", id))
}

fn group_not_found(id: Uuid) -> ProvisioningError {
    ProvisioningError::NotFound(format!("Group {} not found", id))
}

fn not_found_as(e: DbError, not_found: impl FnOnce() -> ProvisioningError) -> ProvisioningError {
    match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        db::tests::harness::sqlite_db_pool,
        models::MemberRef,
        scim::ScimErrorType,
    };

    async fn service() -> ProvisioningService {
        ProvisioningService::new(sqlite_db_pool().await, 1000)
    }

    fn user(name: &str) -> CreateUser {
        CreateUser {
            active: true,
            user_name: name.to_string(),
            given_name: Some("Test".to_string()),
            family_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn group(name: &str, member_ids: Vec<Uuid>) -> CreateGroup {
        CreateGroup {
            display_name: name.to_string(),
            member_ids,
        }
    }

    fn params(filter: Option<&str>, start_index: Option<i64>, count: Option<i64>) -> ScimListParams {
        ScimListParams {
            filter: filter.map(str::to_string),
            start_index,
            count,
        }
    }

    #[tokio::test]
    async fn test_page_window() {
        let service = service().await;
        let window = |start, count| service.page_window(&params(None, start, count));

        assert_eq!(window(None, None), (1, ListWindow::new(0, 1000)));
        assert_eq!(window(Some(2), Some(10)), (2, ListWindow::new(1, 10)));
        assert_eq!(window(Some(0), Some(5)), (1, ListWindow::new(0, 5)));
        assert_eq!(window(Some(-3), None), (1, ListWindow::new(0, 1000)));
        assert_eq!(window(Some(1), Some(5000)), (1, ListWindow::new(0, 1000)));
        assert_eq!(window(Some(1), Some(-1)), (1, ListWindow::new(0, 0)));
    }

    #[tokio::test]
    async fn test_pagination_returns_clamped_window() {
        let service = service().await;
        for i in 1..=5 {
            service.create_user(user(&format!("user{}", i))).await.unwrap();
        }

        let page = service
            .list_users(&params(None, Some(2), Some(10)))
            .await
            .unwrap();
        assert_eq!(page.start_index, 2);
        assert_eq!(page.resources.len(), 4);
        assert_eq!(page.resources[0].user.user_name, "user2");
        assert_eq!(page.resources[3].user.user_name, "user5");
    }

    #[tokio::test]
    async fn test_create_user_with_groups_is_hydrated() {
        let service = service().await;
        let admins = service.create_group(group("Admins", vec![])).await.unwrap();

        let created = service
            .create_user(CreateUser {
                group_ids: vec![admins.group.id],
                ..user("jdoe")
            })
            .await
            .unwrap();
        assert_eq!(
            created.groups,
            vec![MemberRef::group(admins.group.id, "Admins")]
        );

        let fetched = service.get_group(&admins.group.id.to_string()).await.unwrap();
        assert_eq!(
            fetched.members,
            vec![MemberRef::user(created.user.id, "Test jdoe")]
        );
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let service = service().await;
        service.create_user(user("jdoe")).await.unwrap();

        let err = service.create_user(user("jdoe")).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Conflict(_)));
        let scim: ScimErrorResponse = err.into();
        assert_eq!(scim.status, "409");
        assert_eq!(scim.scim_type, Some(ScimErrorType::Uniqueness));

        let page = service.list_users(&params(None, None, None)).await.unwrap();
        assert_eq!(page.resources.len(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_and_malformed_ids() {
        let service = service().await;

        let err = service.get_user(&Uuid::new_v4().to_string()).await.unwrap_err();
        assert!(matches!(err, ProvisioningError::NotFound(_)));

        let err = service.get_group("not-a-uuid").await.unwrap_err();
        assert_eq!(err.to_string(), "Group not-a-uuid not found");
    }

    #[tokio::test]
    async fn test_filtered_list() {
        let service = service().await;
        service.create_user(user("alice")).await.unwrap();
        service.create_user(user("bob")).await.unwrap();

        let page = service
            .list_users(&params(Some(r#"username eq "bob""#), None, None))
            .await
            .unwrap();
        assert_eq!(page.resources.len(), 1);
        assert_eq!(page.resources[0].user.user_name, "bob");

        let page = service
            .list_users(&params(Some(r#"userName eq "nosuchuser""#), None, None))
            .await
            .unwrap();
        assert!(page.resources.is_empty());

        let page = service
            .list_users(&params(Some(r#"id eq "user-1""#), None, None))
            .await
            .unwrap();
        assert!(page.resources.is_empty());
    }

    #[tokio::test]
    async fn test_filter_errors() {
        let service = service().await;

        let err = service
            .list_users(&params(Some(r#"title eq "boss""#), None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::InvalidFilterAttribute(_)));

        let err = service
            .list_groups(&params(Some(r#"displayName co "x""#), None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::InvalidFilter(_)));
        let scim: ScimErrorResponse = err.into();
        assert_eq!(scim.scim_type, Some(ScimErrorType::InvalidFilter));
    }

    #[tokio::test]
    async fn test_replace_user_replaces_memberships() {
        let service = service().await;
        let a = service.create_group(group("A", vec![])).await.unwrap().group.id;
        let b = service.create_group(group("B", vec![])).await.unwrap().group.id;
        let created = service
            .create_user(CreateUser {
                group_ids: vec![a],
                ..user("jdoe")
            })
            .await
            .unwrap();

        let replaced = service
            .replace_user(
                &created.user.id.to_string(),
                CreateUser {
                    email: Some("j@x.com".into()),
                    group_ids: vec![b],
                    ..user("jdoe")
                },
            )
            .await
            .unwrap();

        assert_eq!(replaced.user.email.as_deref(), Some("j@x.com"));
        assert_eq!(replaced.groups, vec![MemberRef::group(b, "B")]);
        let a_group = service.get_group(&a.to_string()).await.unwrap();
        assert!(a_group.members.is_empty());
    }

    #[tokio::test]
    async fn test_replace_missing_is_not_found() {
        let service = service().await;
        let err = service
            .replace_group(&Uuid::new_v4().to_string(), group("x", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_patch_attribute() {
        let service = service().await;
        let id = service.create_user(user("jdoe")).await.unwrap().user.id;

        let patched = service
            .patch_user_attribute(id, "active", &json!("false"))
            .await
            .unwrap();
        assert!(!patched.user.active);

        let patched = service
            .patch_user_attribute(id, "GIVENNAME", &json!("Jane"))
            .await
            .unwrap();
        assert_eq!(patched.user.given_name.as_deref(), Some("Jane"));

        let err = service
            .patch_user_attribute(id, "title", &json!("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::InvalidAttribute(_)));

        let err = service
            .patch_user_attribute(id, "id", &json!(Uuid::new_v4().to_string()))
            .await
            .unwrap_err();
        let scim: ScimErrorResponse = err.into();
        assert_eq!(scim.scim_type, Some(ScimErrorType::Mutability));
    }

    #[tokio::test]
    async fn test_membership_round_trip() {
        let service = service().await;
        let user_id = service.create_user(user("jdoe")).await.unwrap().user.id;
        let group_id = service.create_group(group("G", vec![])).await.unwrap().group.id;

        service.add_membership(user_id, group_id).await.unwrap();
        service.add_membership(user_id, group_id).await.unwrap();
        let fetched = service.get_user(&user_id.to_string()).await.unwrap();
        assert_eq!(fetched.groups.len(), 1);

        service.remove_membership(user_id, group_id).await.unwrap();
        service.remove_membership(user_id, group_id).await.unwrap();
        let fetched = service.get_user(&user_id.to_string()).await.unwrap();
        assert!(fetched.groups.is_empty());

        let err = service
            .add_membership(Uuid::new_v4(), group_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisioningError::NotFound(_)));
    }

    #[test]
    fn test_storage_error_is_internal() {
        let scim: ScimErrorResponse =
            ProvisioningError::from(DbError::Internal("disk full".into())).into();
        assert_eq!(scim.status, "500");
        assert!(scim.detail.contains("disk full"));
    }

    #[test]
    fn test_unsupported_operation_is_forbidden() {
        let scim: ScimErrorResponse = ProvisioningError::OperationNotSupported.into();
        assert_eq!(scim.status, "403");
        assert_eq!(scim.detail, "Operation Not Supported");
    }
}
