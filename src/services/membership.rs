use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{MemberRef, Membership};

/// In-memory view of the user/group relation, built from one membership
/// query and shared by every resource rendered in the same request.
#[derive(Debug, Default, Clone)]
pub struct MembershipIndex {
    by_user: HashMap<Uuid, Vec<MemberRef>>,
    by_group: HashMap<Uuid, Vec<MemberRef>>,
}

impl MembershipIndex {
    /// Index a membership snapshot. Input order is preserved per resource.
    pub fn new(memberships: impl IntoIterator<Item = Membership>) -> Self {
        let mut index = Self::default();
        for m in memberships {
            index
                .by_user
                .entry(m.user_id)
                .or_default()
                .push(MemberRef::group(m.group_id, m.group_display));
            index
                .by_group
                .entry(m.group_id)
                .or_default()
                .push(MemberRef::user(m.user_id, m.user_display));
        }
        index
    }

    /// The `groups` a user belongs to.
    pub fn groups_for_user(&self, user_id: Uuid) -> Vec<MemberRef> {
        self.by_user.get(&user_id).cloned().unwrap_or_default()
    }

    /// The `members` of a group.
    pub fn users_for_group(&self, group_id: Uuid) -> Vec<MemberRef> {
        self.by_group.get(&group_id).cloned().unwrap_or_default()
    }
}
