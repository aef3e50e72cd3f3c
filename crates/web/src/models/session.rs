//! Session-related types.

use serde::{Deserialize, Serialize};

use foodcoop_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user. The
/// full [`crate::models::User`] is loaded from the store on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    /// The foodcoop this session was opened for.
    pub scope: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the pending flash messages.
    pub const FLASH: &str = "flash";
}
