//! SCIM 2.0 Protocol Implementation
//!
//! Wire types, filter and PATCH request parsing, and the mapping between
//! stored resources and their SCIM JSON representation.
//!
//! ## RFC References
//!
//! - RFC 7643: SCIM Core Schema
//! - RFC 7644: SCIM Protocol
//!
//! ## Module Structure
//!
//! - [`types`]: SCIM resource, envelope and discovery types
//! - [`error`]: SCIM error responses per RFC 7644
//! - [`filter`]: single-predicate filter parser
//! - [`patch`]: PATCH request model and path parsing
//! - [`render`]: resource rendering and inbound body parsing

pub mod error;
pub mod filter;
pub mod patch;
pub mod render;
pub mod types;

pub use error::*;
pub use filter::{EqualityFilter, FilterParseError, parse_filter};
pub use patch::{PatchOpKind, PatchOperation, PatchPath, PatchRequest, ReferenceList, parse_path};
pub use render::{
    parse_group_input, parse_user_input, render_error, render_group, render_list, render_user,
};
pub use types::*;
