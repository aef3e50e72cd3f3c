//! Bank-transfer references.
//!
//! Members put the reference on their transfers so the treasurer can book
//! the money on the right ordergroup account.

use foodcoop_core::{GroupId, UserId};

/// Prefix every payment reference starts with.
pub const REFERENCE_PREFIX: &str = "FS";

/// The transfer reference for `user` paying into `ordergroup`'s account.
#[must_use]
pub fn payment_reference(ordergroup: GroupId, user: UserId) -> String {
    format!("{REFERENCE_PREFIX}{ordergroup}.{user}")
}
