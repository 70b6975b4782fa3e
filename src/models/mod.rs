mod attribute;
mod group;
mod membership;
mod user;

pub use attribute::*;
pub use group::*;
pub use membership::*;
pub use user::*;
