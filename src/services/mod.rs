mod membership;
mod patch;
mod provisioning;

use std::sync::Arc;

pub use membership::MembershipIndex;
pub use patch::{PatchEngine, PatchOutcome};
pub use provisioning::{
    ProvisioningError, ProvisioningResult, ProvisioningService, ResourcePage,
};

use crate::db::DbPool;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub provisioning: ProvisioningService,
    pub patch: PatchEngine,
}

impl Services {
    pub fn new(db: Arc<DbPool>, max_results: u32) -> Self {
        let provisioning = ProvisioningService::new(db, max_results);
        Self {
            patch: PatchEngine::new(provisioning.clone()),
            provisioning,
        }
    }
}
