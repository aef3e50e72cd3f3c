//! HTTP middleware stack for the dashboard.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, `PostgreSQL` store in production)
//!
//! Scope and login checks are extractors rather than layers so handlers
//! state what they need in their signature.

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod scope;
pub mod session;

pub use auth::{LOGIN_REQUIRED_ALERT, RequireUser, clear_current_user, set_current_user};
pub use flash::{Flash, FlashKind, set_alert, set_notice, take_flash};
pub use request_id::request_id_middleware;
pub use scope::Scope;
pub use session::create_session_layer;
