//! Authentication middleware and extractors.
//!
//! Provides the extractor that requires a logged-in member in route handlers.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::flash::set_alert;
use super::scope::Scope;
use crate::error::AppError;
use crate::models::{CurrentUser, User, session_keys};
use crate::state::AppState;

/// Extractor that requires a member logged in to the request's foodcoop.
///
/// If nobody is logged in, or the session belongs to another foodcoop,
/// returns a redirect to that foodcoop's login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser { user, scope }: RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {} from {}!", user.first_name, scope.as_str())
/// }
/// ```
pub struct RequireUser {
    pub user: User,
    pub scope: Scope,
}

/// Alert shown on the login page after a protected page turned a visitor away.
pub const LOGIN_REQUIRED_ALERT: &str = "Please log in to continue.";

/// Error returned when authentication is required but the member is not logged in.
pub enum AuthRejection {
    /// Redirect to the login page of the given scope.
    RedirectToLogin(Scope),
    /// The scope is unknown or the user could not be loaded.
    App(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(scope) => Redirect::to(&scope.path("/login")).into_response(),
            Self::App(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scope = Scope::from_request_parts(parts, state)
            .await
            .map_err(AuthRejection::App)?;

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AuthRejection::App(AppError::Internal("missing session layer".into())))?;

        let current: Option<CurrentUser> = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();

        let Some(current) = current.filter(|c| c.scope == scope.as_str()) else {
            let _ = set_alert(&session, LOGIN_REQUIRED_ALERT).await;
            return Err(AuthRejection::RedirectToLogin(scope));
        };

        let user = state
            .store()
            .get_user(current.id)
            .await
            .map_err(|e| AuthRejection::App(e.into()))?;

        match user {
            Some(user) => Ok(Self { user, scope }),
            None => {
                // Account deleted since login
                let _ = clear_current_user(&session).await;
                let _ = set_alert(&session, LOGIN_REQUIRED_ALERT).await;
                Err(AuthRejection::RedirectToLogin(scope))
            }
        }
    }
}

/// Helper to set the current member in the session.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current member from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
