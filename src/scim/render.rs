//! Mapping between stored resources and their SCIM JSON form.
//!
//! Rendering is infallible. Parsing is lenient about what may be missing
//! (`name`, `emails`, `groups`, `members`) and strict about what must be
//! present (`userName`, `displayName`).

use axum::http::StatusCode;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use super::{
    error::{ScimErrorResponse, ScimResult},
    types::{
        SCHEMA_GROUP, SCHEMA_USER, ScimEmail, ScimGroup, ScimListResponse, ScimMeta, ScimName,
        ScimUser,
    },
};
use crate::models::{CreateGroup, CreateUser, GroupResource, UserResource, is_truthy};

pub fn render_user(resource: &UserResource, location: impl Into<String>) -> ScimUser {
    let user = &resource.user;
    ScimUser {
        schemas: vec![SCHEMA_USER.to_string()],
        id: user.id.to_string(),
        user_name: user.user_name.clone(),
        name: ScimName {
            given_name: user.given_name.clone(),
            middle_name: user.middle_name.clone(),
            family_name: user.family_name.clone(),
        },
        emails: vec![ScimEmail::work_primary(user.email.clone())],
        active: user.active,
        groups: resource.groups.clone(),
        meta: ScimMeta::user(location),
    }
}

pub fn render_group(resource: &GroupResource, location: impl Into<String>) -> ScimGroup {
    ScimGroup {
        schemas: vec![SCHEMA_GROUP.to_string()],
        id: resource.group.id.to_string(),
        display_name: resource.group.display_name.clone(),
        members: resource.members.clone(),
        meta: ScimMeta::group(location),
    }
}

/// Wrap one page of rendered resources, each located under `collection_url`.
pub fn render_list<R, T>(
    resources: &[R],
    start_index: u32,
    collection_url: &str,
    render: impl Fn(&R, String) -> T,
    id_of: impl Fn(&R) -> Uuid,
) -> ScimListResponse<T> {
    let rendered = resources
        .iter()
        .map(|r| render(r, format!("{}/{}", collection_url, id_of(r))))
        .collect();
    ScimListResponse::new(rendered, start_index)
}

pub fn render_error(detail: impl Into<String>, status: StatusCode) -> ScimErrorResponse {
    ScimErrorResponse::with_status(status, detail)
}

/// Map an inbound SCIM User body onto the internal model.
///
/// `emails[0].value` becomes the stored email and `groups[*].value` the
/// requested group memberships.
pub fn parse_user_input(body: &Value) -> ScimResult<CreateUser> {
    let object = as_object(body)?;

    let user_name = required_string(object, "userName")?;
    let active = object.get("active").is_some_and(is_truthy);

    let name = match object.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::Object(name)) => Some(name),
        Some(_) => return Err(ScimErrorResponse::invalid_value("'name' must be an object")),
    };
    let name_part = |key: &str| -> ScimResult<Option<String>> {
        match name {
            Some(name) => optional_string(name, key),
            None => Ok(None),
        }
    };

    let email = match object.get("emails") {
        None | Some(Value::Null) => None,
        Some(Value::Array(emails)) => match emails.first() {
            Some(Value::Object(first)) => optional_string(first, "value")?,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ScimErrorResponse::invalid_value(
                    "'emails' entries must be objects",
                ));
            }
            None => None,
        },
        Some(_) => return Err(ScimErrorResponse::invalid_value("'emails' must be an array")),
    };

    let input = CreateUser {
        active,
        user_name,
        given_name: name_part("givenName")?,
        middle_name: name_part("middleName")?,
        family_name: name_part("familyName")?,
        email,
        group_ids: reference_ids(object.get("groups"), "Group")?,
    };
    input
        .validate()
        .map_err(|e| ScimErrorResponse::invalid_value(format!("Invalid User: {}", e)))?;

    Ok(input)
}

/// Map an inbound SCIM Group body onto the internal model.
pub fn parse_group_input(body: &Value) -> ScimResult<CreateGroup> {
    let object = as_object(body)?;

    let input = CreateGroup {
        display_name: required_string(object, "displayName")?,
        member_ids: reference_ids(object.get("members"), "User")?,
    };
    input
        .validate()
        .map_err(|e| ScimErrorResponse::invalid_value(format!("Invalid Group: {}", e)))?;

    Ok(input)
}

/// Collect the ids carried by a `groups`/`members` value.
///
/// Accepts `[{"value": id}, ...]`, `{"value": id}`, `{"value": [ids]}` and bare
/// id strings, in any combination. Numbers are read as their decimal text.
pub fn reference_values(value: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    collect_reference_values(value, &mut ids);
    ids
}

fn collect_reference_values(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Array(items) => items
            .iter()
            .for_each(|item| collect_reference_values(item, ids)),
        Value::Object(object) => {
            if let Some(inner) = object.get("value") {
                collect_reference_values(inner, ids);
            }
        }
        Value::String(s) => ids.push(s.clone()),
        Value::Number(n) => ids.push(n.to_string()),
        Value::Null | Value::Bool(_) => {}
    }
}

/// Parse a referenced id. Anything that is not an id this server could
/// have issued cannot exist, so it is reported as not found.
pub fn parse_reference_id(raw: &str, resource: &str) -> ScimResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ScimErrorResponse::not_found(format!("{} {} not found", resource, raw)))
}

fn reference_ids(value: Option<&Value>, resource: &str) -> ScimResult<Vec<Uuid>> {
    value
        .map(reference_values)
        .unwrap_or_default()
        .iter()
        .map(|raw| parse_reference_id(raw, resource))
        .collect()
}

fn as_object(body: &Value) -> ScimResult<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| ScimErrorResponse::invalid_syntax("Request body must be a JSON object"))
}

fn required_string(object: &Map<String, Value>, key: &str) -> ScimResult<String> {
    match optional_string(object, key)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ScimErrorResponse::invalid_value(format!(
            "'{}' is required",
            key
        ))),
    }
}

fn optional_string(object: &Map<String, Value>, key: &str) -> ScimResult<Option<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(ScimErrorResponse::invalid_value(format!(
            "'{}' must be a single value",
            key
        ))),
    }
}
