pub mod health;
pub mod scim;

pub use scim::{DiscoveryDocuments, SCIM_PREFIX, scim_routes};
