//! Foodcoop Core - Shared domain types.
//!
//! This crate provides common types used across all foodcoop components:
//! - `web` - The member-facing dashboard server
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. This keeps it lightweight and allows the same
//! ordering rules to be shared by every storage backend.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, group kinds and transaction orderings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
