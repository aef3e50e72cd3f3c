//! Authentication route handlers.
//!
//! Members log in per foodcoop; a session only counts for the foodcoop it
//! was created in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use super::Page;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{Scope, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: Page,
    pub email: String,
    pub error: Option<String>,
}

/// Redirect the bare scope to the dashboard.
pub async fn scope_root(scope: Scope) -> Redirect {
    Redirect::to(&scope.path("/home"))
}

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    scope: Scope,
    session: Session,
) -> Response {
    let current: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();
    if current.is_some_and(|c| c.scope == scope.as_str()) {
        return Redirect::to(&scope.path("/home")).into_response();
    }

    LoginTemplate {
        page: Page::new(&state, &scope, None, &session).await,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    scope: Scope,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.store())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email.clone(),
                scope: scope.as_str().to_owned(),
            };
            set_current_user(&session, &current).await?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            tracing::info!(user_id = %user.id, scope = scope.as_str(), "Member logged in");

            Ok(Redirect::to(&scope.path("/home")).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!(scope = scope.as_str(), "Login failed");
            Ok(LoginTemplate {
                page: Page::new(&state, &scope, None, &session).await,
                email: form.email,
                error: Some("Invalid email or password.".to_string()),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle logout.
pub async fn logout(scope: Scope, session: Session) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();

    Ok(Redirect::to(&scope.path("/login")))
}
