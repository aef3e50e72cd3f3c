//! Group and membership domain types.

use chrono::{DateTime, Utc};

use foodcoop_core::{GroupId, GroupKind, MembershipId, UserId};

/// An ordergroup or workgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub kind: GroupKind,
    pub contact_address: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn is_ordergroup(&self) -> bool {
        self.kind == GroupKind::Ordergroup
    }
}

/// Links a user to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub group_id: GroupId,
}

/// A membership together with the group it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipWithGroup {
    pub membership: Membership,
    pub group: Group,
}
