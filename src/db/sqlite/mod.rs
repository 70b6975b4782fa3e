mod common;
mod groups;
mod memberships;
mod users;

pub use groups::SqliteGroupRepo;
pub use memberships::SqliteMembershipRepo;
pub use users::SqliteUserRepo;
