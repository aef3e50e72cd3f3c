//! Domain models for the dashboard.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod financial_transaction;
pub mod group;
pub mod session;
pub mod task;
pub mod user;

pub use financial_transaction::FinancialTransaction;
pub use group::{Group, Membership, MembershipWithGroup};
pub use session::{CurrentUser, keys as session_keys};
pub use task::{Assignment, Task, TaskWithAssignments};
pub use user::{NewUser, ProfileUpdate, User};
