//! One-shot messages carried across a redirect.
//!
//! A handler stores a message before redirecting; the next page rendered
//! for the same session takes it out and shows it once.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Notice,
    Alert,
}

impl FlashKind {
    /// CSS class used by the layout.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Alert => "alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

/// Store a notice for the next page view.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_notice(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    set(session, FlashKind::Notice, message.into()).await
}

/// Store an alert for the next page view.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_alert(
    session: &Session,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    set(session, FlashKind::Alert, message.into()).await
}

async fn set(
    session: &Session,
    kind: FlashKind,
    message: String,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::FLASH, Flash { kind, message })
        .await
}

/// Take the pending message, if any. Unreadable entries are dropped.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
