mod groups;
mod memberships;
mod users;

pub use groups::*;
pub use memberships::*;
pub use users::*;

/// A 0-based offset/limit window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub offset: i64,
    pub limit: i64,
}

impl ListWindow {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.max(0),
        }
    }
}
