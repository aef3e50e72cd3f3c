//! User domain types.

use chrono::{DateTime, Utc};

use foodcoop_core::{Email, GroupId, UserId};

/// A foodcoop member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// First and last name, separated by a space.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        full.trim().to_owned()
    }
}

/// Data needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub password_hash: String,
}

/// A validated, complete set of profile values to persist.
///
/// Built by [`crate::services::profile`] once every submitted field passed
/// validation and at least one value differs from what is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: Option<String>,
    /// New argon2 hash when the password changes.
    pub password_hash: Option<String>,
    /// New contact address for the user's ordergroup.
    pub ordergroup_contact: Option<(GroupId, Option<String>)>,
}
