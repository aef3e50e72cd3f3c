//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database)
//!
//! # Scoped (first segment is the foodcoop)
//! GET  /{foodcoop}                          - Redirect to dashboard
//! GET  /{foodcoop}/login                    - Login page
//! POST /{foodcoop}/login                    - Login action
//! POST /{foodcoop}/logout                   - Logout action
//!
//! # Dashboard (requires login)
//! GET  /{foodcoop}/home                     - Task dashboard
//! GET  /{foodcoop}/home/profile             - Profile form
//! PATCH /{foodcoop}/home/profile            - Same as update_profile
//! GET|PATCH|POST /{foodcoop}/home/update_profile
//! GET  /{foodcoop}/home/reference_calculator
//! GET  /{foodcoop}/home/ordergroup?sort=    - Ordergroup account
//! GET|POST /{foodcoop}/home/cancel_membership?group_id=|membership_id=
//! ```
//!
//! Plugins add further scoped routes, see [`crate::plugins`].

pub mod auth;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{Flash, Scope, take_flash};
use crate::models::User;
use crate::state::AppState;

/// Data every page layout needs.
#[derive(Debug, Clone)]
pub struct Page {
    pub scope: String,
    pub user_name: Option<String>,
    pub flash: Option<Flash>,
    pub use_bnn_upload: bool,
}

impl Page {
    /// Build the layout data, consuming any pending flash message.
    pub async fn new(
        state: &AppState,
        scope: &Scope,
        user: Option<&User>,
        session: &Session,
    ) -> Self {
        Self {
            scope: scope.as_str().to_owned(),
            user_name: user.map(User::display_name),
            flash: take_flash(session).await,
            use_bnn_upload: state.features().use_bnn_upload,
        }
    }
}

/// Create the dashboard routes router.
pub fn home_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/profile", get(home::profile).patch(home::update_profile))
        .route(
            "/update_profile",
            get(home::update_profile)
                .patch(home::update_profile)
                .post(home::update_profile),
        )
        .route("/reference_calculator", get(home::reference_calculator))
        .route("/ordergroup", get(home::ordergroup))
        .route(
            "/cancel_membership",
            get(home::cancel_membership).post(home::cancel_membership),
        )
}

/// Create all routes below `/{foodcoop}`.
pub fn scoped_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::scope_root))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .nest("/home", home_routes())
}
