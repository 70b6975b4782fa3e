mod common;
mod groups;
mod memberships;
mod users;

pub use groups::PostgresGroupRepo;
pub use memberships::PostgresMembershipRepo;
pub use users::PostgresUserRepo;
