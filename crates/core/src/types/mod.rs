//! Core types for the foodcoop dashboard.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod group;
pub mod id;
pub mod sort;

pub use email::{Email, EmailError};
pub use group::{GroupKind, UnknownGroupKind};
pub use id::*;
pub use sort::{SortFields, TransactionSort};
