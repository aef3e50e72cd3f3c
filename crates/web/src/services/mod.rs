//! Business logic between the route handlers and the store.

pub mod auth;
pub mod dashboard;
pub mod profile;
pub mod reference;

pub use auth::{AuthError, AuthService};
pub use dashboard::DashboardTasks;
pub use profile::{ProfileError, ProfileForm, ProfileOutcome, ProfileParams, ProfileService};
