//! Wire shapes: the User and Group resources, the list envelope and the
//! discovery documents (RFC 7643, RFC 7644 §4).

use serde::{Deserialize, Serialize};

use crate::models::MemberRef;

pub const SCHEMA_USER: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const SCHEMA_GROUP: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const SCHEMA_LIST_RESPONSE: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";
pub const SCHEMA_ERROR: &str = "urn:ietf:params:scim:api:messages:2.0:Error";
pub const SCHEMA_PATCH_OP: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";
pub const SCHEMA_SERVICE_PROVIDER_CONFIG: &str =
    "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig";
pub const SCHEMA_RESOURCE_TYPE: &str = "urn:ietf:params:scim:schemas:core:2.0:ResourceType";
pub const SCHEMA_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Schema";

/// Media type of every SCIM response body.
pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimMeta {
    pub resource_type: String,
    pub location: String,
}

impl ScimMeta {
    pub fn new(resource_type: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            location: location.into(),
        }
    }

    pub fn user(location: impl Into<String>) -> Self {
        Self::new("User", location)
    }

    pub fn group(location: impl Into<String>) -> Self {
        Self::new("Group", location)
    }
}

/// A user as returned by every Users endpoint.
///
/// All keys are always present; unset name parts render as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    pub schemas: Vec<String>,
    pub id: String,
    pub user_name: String,
    pub name: ScimName,
    /// Exactly one entry, even when no email is stored.
    pub emails: Vec<ScimEmail>,
    pub active: bool,
    /// Read-only; comes from the membership index.
    pub groups: Vec<MemberRef>,
    pub meta: ScimMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimName {
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScimEmail {
    pub primary: bool,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ScimEmail {
    pub fn work_primary(value: Option<String>) -> Self {
        Self {
            primary: true,
            value,
            kind: "work".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    pub schemas: Vec<String>,
    pub id: String,
    pub display_name: String,
    pub members: Vec<MemberRef>,
    pub meta: ScimMeta,
}

/// List envelope. The store is never counted, so `totalResults` is the
/// length of the returned page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListResponse<T> {
    pub schemas: Vec<String>,
    pub total_results: u32,
    pub items_per_page: u32,
    pub start_index: u32,
    #[serde(rename = "Resources")]
    pub resources: Vec<T>,
}

impl<T> ScimListResponse<T> {
    pub fn new(resources: Vec<T>, start_index: u32) -> Self {
        let returned = u32::try_from(resources.len()).unwrap_or(u32::MAX);
        Self {
            schemas: vec![SCHEMA_LIST_RESPONSE.to_string()],
            total_results: returned,
            items_per_page: returned,
            start_index,
            resources,
        }
    }
}

/// `?filter=&startIndex=&count=` on list endpoints.
///
/// Numbers are signed so that zero and negative values reach the clamping
/// logic instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimListParams {
    pub filter: Option<String>,
    pub start_index: Option<i64>,
    pub count: Option<i64>,
}

/// `GET /ServiceProviderConfig`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_uri: Option<String>,
    pub patch: FeatureSupport,
    pub bulk: BulkSupport,
    pub filter: FilterSupport,
    pub change_password: FeatureSupport,
    pub sort: FeatureSupport,
    pub etag: FeatureSupport,
    pub authentication_schemes: Vec<AuthenticationScheme>,
    pub meta: ScimMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSupport {
    pub supported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u32,
}

impl BulkSupport {
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            max_operations: 0,
            max_payload_size: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    pub supported: bool,
    /// Largest page a list request can return.
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationScheme {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub spec_uri: String,
    pub primary: bool,
}

impl AuthenticationScheme {
    pub fn http_basic() -> Self {
        Self {
            kind: "httpbasic".to_string(),
            name: "HTTP Basic".to_string(),
            description: "Authentication via the HTTP Basic scheme".to_string(),
            spec_uri: "https://www.rfc-editor.org/rfc/rfc7617".to_string(),
            primary: true,
        }
    }
}

/// `GET /ResourceTypes[/{id}]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub schemas: Vec<String>,
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub description: String,
    pub schema: String,
    pub meta: ScimMeta,
}

impl ResourceType {
    fn describe(name: &str, endpoint: &str, description: &str, schema: &str, base: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_RESOURCE_TYPE.to_string()],
            id: name.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            description: description.to_string(),
            schema: schema.to_string(),
            meta: ScimMeta::new("ResourceType", format!("{}/ResourceTypes/{}", base, name)),
        }
    }

    pub fn user(base_url: &str) -> Self {
        Self::describe("User", "/Users", "User Account", SCHEMA_USER, base_url)
    }

    pub fn group(base_url: &str) -> Self {
        Self::describe("Group", "/Groups", "Group of Users", SCHEMA_GROUP, base_url)
    }
}

/// `GET /Schemas[/{uri}]`, listing only the attributes this server stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimSchema {
    pub schemas: Vec<String>,
    pub id: String,
    pub name: String,
    pub description: String,
    pub attributes: Vec<SchemaAttribute>,
    pub meta: ScimMeta,
}

impl ScimSchema {
    fn describe(uri: &str, name: &str, attributes: Vec<SchemaAttribute>, base: &str) -> Self {
        Self {
            schemas: vec![SCHEMA_SCHEMA.to_string()],
            id: uri.to_string(),
            name: name.to_string(),
            description: name.to_string(),
            attributes,
            meta: ScimMeta::new("Schema", format!("{}/Schemas/{}", base, uri)),
        }
    }

    pub fn user(base_url: &str) -> Self {
        use AttributeType::{Boolean, Complex, String};

        let name = SchemaAttribute::new("name", Complex).with_sub_attributes(vec![
            SchemaAttribute::new("givenName", String),
            SchemaAttribute::new("middleName", String),
            SchemaAttribute::new("familyName", String),
        ]);
        let emails = SchemaAttribute::new("emails", Complex)
            .multi_valued()
            .with_sub_attributes(vec![
                SchemaAttribute::new("value", String),
                SchemaAttribute::new("type", String),
                SchemaAttribute::new("primary", Boolean),
            ]);
        let groups = SchemaAttribute::new("groups", Complex)
            .multi_valued()
            .mutability(Mutability::ReadOnly)
            .with_sub_attributes(reference_sub_attributes());

        Self::describe(
            SCHEMA_USER,
            "User",
            vec![
                SchemaAttribute::new("userName", String).required().unique(),
                name,
                emails,
                SchemaAttribute::new("active", Boolean),
                groups,
            ],
            base_url,
        )
    }

    pub fn group(base_url: &str) -> Self {
        let members = SchemaAttribute::new("members", AttributeType::Complex)
            .multi_valued()
            .with_sub_attributes(reference_sub_attributes());

        Self::describe(
            SCHEMA_GROUP,
            "Group",
            vec![
                SchemaAttribute::new("displayName", AttributeType::String)
                    .required()
                    .unique(),
                members,
            ],
            base_url,
        )
    }
}

/// `value`/`$ref`/`display` of a `members` or `groups` entry.
fn reference_sub_attributes() -> Vec<SchemaAttribute> {
    vec![
        SchemaAttribute::new("value", AttributeType::String).mutability(Mutability::Immutable),
        SchemaAttribute::new("$ref", AttributeType::Reference).mutability(Mutability::Immutable),
        SchemaAttribute::new("display", AttributeType::String).mutability(Mutability::ReadOnly),
    ]
}

/// One attribute of a [`ScimSchema`]. Starts optional, single-valued and
/// read-write; chain the modifiers to change that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub multi_valued: bool,
    pub required: bool,
    pub mutability: Mutability,
    pub uniqueness: Uniqueness,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<SchemaAttribute>,
}

impl SchemaAttribute {
    pub fn new(name: &str, kind: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            kind,
            multi_valued: false,
            required: false,
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::None,
            sub_attributes: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.uniqueness = Uniqueness::Server;
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    pub fn with_sub_attributes(mut self, sub_attributes: Vec<SchemaAttribute>) -> Self {
        self.sub_attributes = sub_attributes;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Boolean,
    Reference,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
    Immutable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    None,
    Server,
}
