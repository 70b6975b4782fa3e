//! SCIM 2.0 Discovery Endpoints
//!
//! Implements RFC 7644 Section 4 discovery endpoints:
//! - ServiceProviderConfig: Advertises service capabilities
//! - ResourceTypes: Lists supported resource types (User, Group)
//! - Schemas: Lists and retrieves schema definitions

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};

use super::{ScimJson, base_url};
use crate::{
    AppState,
    config::ScimConfig,
    scim::{
        AuthenticationScheme, BulkSupport, FeatureSupport, FilterSupport, ResourceType,
        SCHEMA_GROUP, SCHEMA_SERVICE_PROVIDER_CONFIG, SCHEMA_USER, ScimErrorResponse,
        ScimListResponse, ScimMeta, ScimResult, ScimSchema, ServiceProviderConfig,
    },
};

/// Static capabilities of this server, built once from configuration.
///
/// Only `location` values depend on the request, so documents are rendered
/// against a base URL on each call.
#[derive(Debug, Clone)]
pub struct DiscoveryDocuments {
    max_results: u32,
    documentation_uri: Option<String>,
}

impl DiscoveryDocuments {
    pub fn new(config: &ScimConfig) -> Self {
        Self {
            max_results: config.max_results,
            documentation_uri: config.documentation_uri.clone(),
        }
    }

    /// PATCH and single-predicate `eq` filtering are supported; bulk, sort,
    /// etags and password changes are not.
    pub fn service_provider_config(&self, base_url: &str) -> ServiceProviderConfig {
        ServiceProviderConfig {
            schemas: vec![SCHEMA_SERVICE_PROVIDER_CONFIG.to_string()],
            documentation_uri: self.documentation_uri.clone(),
            patch: FeatureSupport { supported: true },
            bulk: BulkSupport::unsupported(),
            filter: FilterSupport {
                supported: true,
                max_results: self.max_results,
            },
            change_password: FeatureSupport { supported: false },
            sort: FeatureSupport { supported: false },
            etag: FeatureSupport { supported: false },
            authentication_schemes: vec![AuthenticationScheme::http_basic()],
            meta: ScimMeta::new(
                "ServiceProviderConfig",
                format!("{}/ServiceProviderConfig", base_url),
            ),
        }
    }

    pub fn resource_types(&self, base_url: &str) -> Vec<ResourceType> {
        vec![ResourceType::user(base_url), ResourceType::group(base_url)]
    }

    pub fn resource_type(&self, id: &str, base_url: &str) -> Option<ResourceType> {
        self.resource_types(base_url)
            .into_iter()
            .find(|rt| rt.id == id)
    }

    pub fn schemas(&self, base_url: &str) -> Vec<ScimSchema> {
        vec![ScimSchema::user(base_url), ScimSchema::group(base_url)]
    }

    /// Look up a schema by its URN.
    pub fn schema(&self, id: &str, base_url: &str) -> Option<ScimSchema> {
        match id {
            SCHEMA_USER => Some(ScimSchema::user(base_url)),
            SCHEMA_GROUP => Some(ScimSchema::group(base_url)),
            _ => None,
        }
    }
}

/// `GET /scim/v2/ServiceProviderConfig`
#[tracing::instrument(name = "scim.discovery.service_provider_config", skip_all)]
pub async fn service_provider_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ScimJson<ServiceProviderConfig> {
    let base_url = base_url(&state.config.server, &headers);
    ScimJson::ok(state.discovery.service_provider_config(&base_url))
}

/// `GET /scim/v2/ResourceTypes`
#[tracing::instrument(name = "scim.discovery.resource_types", skip_all)]
pub async fn resource_types(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ScimJson<ScimListResponse<ResourceType>> {
    let base_url = base_url(&state.config.server, &headers);
    ScimJson::ok(ScimListResponse::new(
        state.discovery.resource_types(&base_url),
        1,
    ))
}

/// `GET /scim/v2/ResourceTypes/{id}`
#[tracing::instrument(name = "scim.discovery.resource_type", skip_all, fields(%id))]
pub async fn resource_type(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<ResourceType>> {
    let base_url = base_url(&state.config.server, &headers);
    state
        .discovery
        .resource_type(&id, &base_url)
        .map(ScimJson::ok)
        .ok_or_else(|| ScimErrorResponse::not_found(format!("ResourceType '{}' not found", id)))
}

/// `GET /scim/v2/Schemas`
#[tracing::instrument(name = "scim.discovery.schemas", skip_all)]
pub async fn schemas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ScimJson<ScimListResponse<ScimSchema>> {
    let base_url = base_url(&state.config.server, &headers);
    ScimJson::ok(ScimListResponse::new(state.discovery.schemas(&base_url), 1))
}

/// `GET /scim/v2/Schemas/{id}`
///
/// The path segment is URL-decoded by the extractor, so both the raw URN and
/// its percent-encoded form resolve.
#[tracing::instrument(name = "scim.discovery.schema", skip_all, fields(%id))]
pub async fn schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ScimResult<ScimJson<ScimSchema>> {
    let base_url = base_url(&state.config.server, &headers);
    state
        .discovery
        .schema(&id, &base_url)
        .map(ScimJson::ok)
        .ok_or_else(|| ScimErrorResponse::not_found(format!("Schema '{}' not found", id)))
}
