//! SCIM PATCH execution.
//!
//! Operations run in request order against the live resource. Attribute
//! assignments keep going after a failure so every bad attribute is reported;
//! membership lists stop at the first reference that fails. Failures are
//! folded into a [`PatchOutcome`] and only a clean outcome returns the
//! re-read resource.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ProvisioningError, ProvisioningService, provisioning::parse_id};
use crate::{
    models::{GroupResource, UserResource},
    scim::{
        PatchOpKind, PatchOperation, PatchPath, PatchRequest, ReferenceList, ScimErrorResponse,
        ScimResult, render::reference_values,
    },
};

/// Accumulated result of a PATCH request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    status: StatusCode,
    errors: Vec<ScimErrorResponse>,
}

impl Default for PatchOutcome {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            errors: Vec::new(),
        }
    }
}

impl PatchOutcome {
    pub fn record(&mut self, error: impl Into<ScimErrorResponse>) {
        let error = error.into();
        self.status = error.status_code();
        self.errors.push(error);
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Status of the last failure, or 200.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Collapse the recorded failures into one payload.
    ///
    /// A single failure is returned as is. Several are merged, with details
    /// joined by `"; "` and the status of the last one.
    pub fn into_error(mut self) -> Option<ScimErrorResponse> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => {
                let detail = self
                    .errors
                    .iter()
                    .map(|e| e.detail.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                let mut merged = ScimErrorResponse::with_status(self.status, detail);
                merged.scim_type = self.errors.last().and_then(|e| e.scim_type);
                Some(merged)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    User(Uuid),
    Group(Uuid),
}

impl Target {
    fn id(self) -> Uuid {
        match self {
            Target::User(id) | Target::Group(id) => id,
        }
    }

    /// The reference list this resource owns.
    fn own_list(self) -> ReferenceList {
        match self {
            Target::User(_) => ReferenceList::Groups,
            Target::Group(_) => ReferenceList::Members,
        }
    }

    /// `(user, group)` for a membership between this resource and `other`.
    fn pair(self, other: Uuid) -> (Uuid, Uuid) {
        match self {
            Target::User(user_id) => (user_id, other),
            Target::Group(group_id) => (other, group_id),
        }
    }

    /// Kind of resource a reference in the own list points to.
    fn referenced(self) -> &'static str {
        match self {
            Target::User(_) => "Group",
            Target::Group(_) => "User",
        }
    }
}

/// Applies PATCH requests through the provisioning service.
#[derive(Clone)]
pub struct PatchEngine {
    service: ProvisioningService,
}

impl PatchEngine {
    pub fn new(service: ProvisioningService) -> Self {
        Self { service }
    }

    #[tracing::instrument(skip(self, request), fields(operations = request.operations.len()))]
    pub async fn patch_user(&self, id: &str, request: PatchRequest) -> ScimResult<UserResource> {
        let existing = self.service.get_user(id).await?;
        let target = Target::User(existing.user.id);

        let outcome = self.apply(target, &request).await;
        match outcome.into_error() {
            None => Ok(self.service.get_user(id).await?),
            Some(error) => Err(error),
        }
    }

    #[tracing::instrument(skip(self, request), fields(operations = request.operations.len()))]
    pub async fn patch_group(&self, id: &str, request: PatchRequest) -> ScimResult<GroupResource> {
        let existing = self.service.get_group(id).await?;
        let target = Target::Group(existing.group.id);

        let outcome = self.apply(target, &request).await;
        match outcome.into_error() {
            None => Ok(self.service.get_group(id).await?),
            Some(error) => Err(error),
        }
    }

    async fn apply(&self, target: Target, request: &PatchRequest) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();
        for (index, operation) in request.operations.iter().enumerate() {
            debug!(index, op = %operation.op, path = ?operation.path, "Applying patch operation");
            let before = outcome.errors.len();
            self.apply_operation(target, operation, &mut outcome).await;
            if outcome.errors.len() > before {
                warn!(index, op = %operation.op, status = %outcome.status(), "Patch operation failed");
            }
        }
        outcome
    }

    async fn apply_operation(
        &self,
        target: Target,
        operation: &PatchOperation,
        outcome: &mut PatchOutcome,
    ) {
        let value = operation.value.as_ref().unwrap_or(&Value::Null);
        let own = target.own_list();

        match (operation.kind(), operation.target()) {
            (PatchOpKind::Replace, None) | (PatchOpKind::Add, None) => {
                self.assign_all(target, value, outcome).await;
            }
            (PatchOpKind::Replace, Some(PatchPath::Attribute(path))) => {
                self.assign_path(target, &path, value, outcome).await;
            }
            (PatchOpKind::Add, Some(PatchPath::List(list))) if list == own => {
                self.add_references(target, value, outcome).await;
            }
            (PatchOpKind::Remove, Some(PatchPath::Entry(list, id))) if list == own => {
                self.remove_reference(target, &id, outcome).await;
            }
            (PatchOpKind::Remove, Some(PatchPath::List(list)))
                if list == own && operation.value.is_some() =>
            {
                for id in reference_values(value) {
                    self.remove_reference(target, &id, outcome).await;
                }
            }
            (PatchOpKind::Add, Some(PatchPath::Attribute(_)))
                if matches!(target, Target::User(_)) =>
            {
                debug!("Ignoring add to unsupported user attribute");
            }
            _ => outcome.record(ProvisioningError::OperationNotSupported),
        }
    }

    /// Assign every attribute of a `{attribute: value}` map, reporting each
    /// failure and continuing.
    async fn assign_all(&self, target: Target, value: &Value, outcome: &mut PatchOutcome) {
        let Some(attributes) = value.as_object() else {
            outcome.record(ScimErrorResponse::invalid_value(
                "PATCH value without a path must be an object of attribute values",
            ));
            return;
        };

        for (name, value) in attributes {
            match (name.to_ascii_lowercase().as_str(), value) {
                // `name` is a complex attribute whose parts are stored flat
                ("name", Value::Object(parts)) => {
                    for (part, value) in parts {
                        self.assign(target, part, value, outcome).await;
                    }
                }
                _ => self.assign(target, name, value, outcome).await,
            }
        }
    }

    async fn assign_path(
        &self,
        target: Target,
        path: &str,
        value: &Value,
        outcome: &mut PatchOutcome,
    ) {
        let attribute = match path.split_once('.') {
            Some((parent, part)) if parent.eq_ignore_ascii_case("name") => part,
            _ => path,
        };
        self.assign(target, attribute, value, outcome).await;
    }

    async fn assign(
        &self,
        target: Target,
        attribute: &str,
        value: &Value,
        outcome: &mut PatchOutcome,
    ) {
        // Clients such as Okta echo the resource's own id next to the
        // attributes they change; only a different id is a write to `id`.
        if attribute.eq_ignore_ascii_case("id") && restates_id(target, value) {
            debug!("Ignoring id equal to the resource's own id");
            return;
        }

        let result = match target {
            Target::User(id) => self
                .service
                .patch_user_attribute(id, attribute, value)
                .await
                .map(|_| ()),
            Target::Group(id) => self
                .service
                .patch_group_attribute(id, attribute, value)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            outcome.record(e);
        }
    }

    /// Add each referenced id, stopping at the first failure.
    async fn add_references(&self, target: Target, value: &Value, outcome: &mut PatchOutcome) {
        for raw in reference_values(value) {
            let result = match parse_id(&raw, target.referenced()) {
                Ok(other) => {
                    let (user_id, group_id) = target.pair(other);
                    self.service.add_membership(user_id, group_id).await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                outcome.record(e);
                return;
            }
        }
    }

    async fn remove_reference(&self, target: Target, raw: &str, outcome: &mut PatchOutcome) {
        // A malformed id cannot be a member, so there is nothing to remove
        let Ok(other) = Uuid::parse_str(raw.trim()) else {
            debug!(id = raw, "Skipping removal of malformed reference");
            return;
        };
        let (user_id, group_id) = target.pair(other);
        if let Err(e) = self.service.remove_membership(user_id, group_id).await {
            outcome.record(e);
        }
    }
}

fn restates_id(target: Target, value: &Value) -> bool {
    value
        .as_str()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .is_some_and(|id| id == target.id())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::scim::ScimErrorType;

    #[test]
    fn test_outcome_starts_ok() {
        let outcome = PatchOutcome::default();
        assert!(outcome.is_ok());
        assert_eq!(outcome.status(), StatusCode::OK);
        assert_eq!(outcome.into_error(), None);
    }

    #[test]
    fn test_outcome_single_error_passes_through() {
        let mut outcome = PatchOutcome::default();
        outcome.record(ScimErrorResponse::not_found("User x not found"));
        assert_eq!(outcome.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            outcome.into_error(),
            Some(ScimErrorResponse::not_found("User x not found"))
        );
    }

    #[test]
    fn test_outcome_merges_with_last_status() {
        let mut outcome = PatchOutcome::default();
        outcome.record(ScimErrorResponse::invalid_value("bad active"));
        outcome.record(ProvisioningError::OperationNotSupported);

        let error = outcome.into_error().unwrap();
        assert_eq!(error.status, "403");
        assert_eq!(error.detail, "bad active; Operation Not Supported");
        assert_eq!(error.scim_type, None);
    }

    #[test]
    fn test_merged_error_keeps_last_scim_type() {
        let mut outcome = PatchOutcome::default();
        outcome.record(ProvisioningError::OperationNotSupported);
        outcome.record(ScimErrorResponse::uniqueness("taken"));

        let error = outcome.into_error().unwrap();
        assert_eq!(error.status, "409");
        assert_eq!(error.scim_type, Some(ScimErrorType::Uniqueness));
        let body = serde_json::to_value(&error).unwrap();
        assert_eq!(body["detail"], json!("Operation Not Supported; taken"));
    }

    #[cfg(feature = "database-sqlite")]
    mod engine {
        use serde_json::json;

        use super::*;
        use crate::{
            db::tests::harness::sqlite_db_pool,
            models::{CreateGroup, CreateUser, MemberRef},
        };

        async fn setup() -> (ProvisioningService, PatchEngine) {
            let service = ProvisioningService::new(sqlite_db_pool().await, 1000);
            (service.clone(), PatchEngine::new(service))
        }

        async fn create_user(service: &ProvisioningService, name: &str) -> Uuid {
            service
                .create_user(CreateUser {
                    active: true,
                    user_name: name.to_string(),
                    given_name: Some("Test".into()),
                    family_name: Some(name.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap()
                .user
                .id
        }

        async fn create_group(service: &ProvisioningService, name: &str) -> Uuid {
            service
                .create_group(CreateGroup {
                    display_name: name.to_string(),
                    member_ids: Vec::new(),
                })
                .await
                .unwrap()
                .group
                .id
        }

        fn request(operations: Value) -> PatchRequest {
            serde_json::from_value(json!({ "Operations": operations })).unwrap()
        }

        #[tokio::test]
        async fn test_add_members_then_get() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;
            let group_id = create_group(&service, "Admins").await;

            let patched = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{
                        "op": "add", "path": "members",
                        "value": [{"value": user_id.to_string()}]
                    }])),
                )
                .await
                .unwrap();
            assert_eq!(patched.members, vec![MemberRef::user(user_id, "Test alice")]);

            let fetched = service.get_group(&group_id.to_string()).await.unwrap();
            assert_eq!(fetched.members, patched.members);
        }

        #[tokio::test]
        async fn test_unsupported_op_is_forbidden() {
            let (service, engine) = setup().await;
            let group_id = create_group(&service, "Admins").await;

            let err = engine
                .patch_group(&group_id.to_string(), request(json!([{"op": "move"}])))
                .await
                .unwrap_err();
            assert_eq!(err.status, "403");
            assert_eq!(err.detail, "Operation Not Supported");
        }

        #[tokio::test]
        async fn test_attribute_failures_accumulate() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;

            let err = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([{
                        "op": "replace",
                        "value": {"title": "x", "givenName": "Alicia", "nickName": "y"}
                    }])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status, "400");
            assert!(err.detail.contains("title"));
            assert!(err.detail.contains("nickName"));

            // The valid attribute in between was still applied
            let fetched = service.get_user(&user_id.to_string()).await.unwrap();
            assert_eq!(fetched.user.given_name.as_deref(), Some("Alicia"));
        }

        #[tokio::test]
        async fn test_unsupported_op_does_not_stop_later_operations() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;

            let err = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([
                        {"op": "copy", "path": "active"},
                        {"op": "replace", "path": "active", "value": false}
                    ])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status, "403");

            let fetched = service.get_user(&user_id.to_string()).await.unwrap();
            assert!(!fetched.user.active);
        }

        #[tokio::test]
        async fn test_add_members_is_fail_fast() {
            let (service, engine) = setup().await;
            let alice = create_user(&service, "alice").await;
            let bob = create_user(&service, "bob").await;
            let group_id = create_group(&service, "Admins").await;
            let missing = Uuid::new_v4();

            let err = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{
                        "op": "add", "path": "members",
                        "value": [
                            {"value": alice.to_string()},
                            {"value": missing.to_string()},
                            {"value": bob.to_string()}
                        ]
                    }])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status, "404");
            assert_eq!(err.detail, format!("User {} not found", missing));

            let fetched = service.get_group(&group_id.to_string()).await.unwrap();
            assert_eq!(fetched.members, vec![MemberRef::user(alice, "Test alice")]);
        }

        #[tokio::test]
        async fn test_remove_member_by_value_filter() {
            let (service, engine) = setup().await;
            let alice = create_user(&service, "alice").await;
            let bob = create_user(&service, "bob").await;
            let group_id = service
                .create_group(CreateGroup {
                    display_name: "Admins".into(),
                    member_ids: vec![alice, bob],
                })
                .await
                .unwrap()
                .group
                .id;

            let patched = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([
                        {"op": "remove", "path": format!("members[value eq \"{}\"]", alice)},
                        {"op": "remove", "path": "members[value eq \"not-a-member\"]"}
                    ])),
                )
                .await
                .unwrap();
            assert_eq!(patched.members, vec![MemberRef::user(bob, "Test bob")]);
        }

        #[tokio::test]
        async fn test_remove_members_with_value_list() {
            let (service, engine) = setup().await;
            let alice = create_user(&service, "alice").await;
            let group_id = service
                .create_group(CreateGroup {
                    display_name: "Admins".into(),
                    member_ids: vec![alice],
                })
                .await
                .unwrap()
                .group
                .id;

            let patched = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{
                        "op": "remove", "path": "members",
                        "value": [{"value": alice.to_string()}]
                    }])),
                )
                .await
                .unwrap();
            assert!(patched.members.is_empty());
        }

        #[tokio::test]
        async fn test_user_groups_add_and_remove() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;
            let admins = create_group(&service, "Admins").await;
            let eng = create_group(&service, "Engineering").await;

            let patched = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([
                        {"op": "add", "path": "groups", "value": {"value": [admins.to_string(), eng.to_string()]}},
                        {"op": "remove", "path": format!("groups[value eq \"{}\"]", admins)}
                    ])),
                )
                .await
                .unwrap();
            assert_eq!(patched.groups, vec![MemberRef::group(eng, "Engineering")]);
        }

        #[tokio::test]
        async fn test_user_add_with_other_path_is_ignored() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;

            let patched = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([{"op": "add", "path": "nickName", "value": "Al"}])),
                )
                .await
                .unwrap();
            assert_eq!(patched.user.user_name, "alice");
        }

        #[tokio::test]
        async fn test_add_without_path_and_nested_name() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;

            let patched = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([
                        {"op": "Add", "value": {"active": "0", "name": {"familyName": "Smith"}}},
                        {"op": "replace", "path": "name.givenName", "value": "Alice"}
                    ])),
                )
                .await
                .unwrap();
            assert!(!patched.user.active);
            assert_eq!(patched.user.family_name.as_deref(), Some("Smith"));
            assert_eq!(patched.user.given_name.as_deref(), Some("Alice"));
        }

        #[tokio::test]
        async fn test_rename_group_conflict() {
            let (service, engine) = setup().await;
            create_group(&service, "Taken").await;
            let group_id = create_group(&service, "Admins").await;

            let err = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{"op": "replace", "value": {"displayName": "Taken"}}])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status, "409");
        }

        #[tokio::test]
        async fn test_patch_id_is_mutability_error() {
            let (service, engine) = setup().await;
            let user_id = create_user(&service, "alice").await;

            let err = engine
                .patch_user(
                    &user_id.to_string(),
                    request(json!([{"op": "replace", "path": "id", "value": "x"}])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.scim_type, Some(ScimErrorType::Mutability));
        }

        #[tokio::test]
        async fn test_rename_group_echoing_own_id() {
            let (service, engine) = setup().await;
            let group_id = create_group(&service, "Admins").await;

            let patched = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{
                        "op": "replace",
                        "value": {"id": group_id.to_string(), "displayName": "Operators"}
                    }])),
                )
                .await
                .unwrap();
            assert_eq!(patched.group.id, group_id);
            assert_eq!(patched.group.display_name, "Operators");
        }

        #[tokio::test]
        async fn test_patch_different_id_still_rejected() {
            let (service, engine) = setup().await;
            let group_id = create_group(&service, "Admins").await;

            let err = engine
                .patch_group(
                    &group_id.to_string(),
                    request(json!([{
                        "op": "replace",
                        "value": {"id": Uuid::new_v4().to_string(), "displayName": "Operators"}
                    }])),
                )
                .await
                .unwrap_err();
            assert_eq!(err.status, "400");
            assert_eq!(err.scim_type, Some(ScimErrorType::Mutability));
        }

        #[tokio::test]
        async fn test_patch_unknown_resource() {
            let (_, engine) = setup().await;
            let err = engine
                .patch_group(&Uuid::new_v4().to_string(), request(json!([])))
                .await
                .unwrap_err();
            assert_eq!(err.status, "404");
        }
    }
}
