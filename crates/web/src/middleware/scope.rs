//! Foodcoop scope extraction.
//!
//! Every dashboard URL starts with the foodcoop it belongs to, e.g.
//! `/f/home`. Unknown scopes are rejected with a 404.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
struct ScopeParams {
    foodcoop: String,
}

/// The foodcoop scope of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope(pub String);

impl Scope {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute path below this scope, e.g. `scope.path("/home")`.
    #[must_use]
    pub fn path(&self, rest: &str) -> String {
        format!("/{}{rest}", self.0)
    }
}

impl FromRequestParts<AppState> for Scope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(ScopeParams { foodcoop }) =
            Path::<ScopeParams>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::NotFound("foodcoop".to_string()))?;

        if state.config().has_scope(&foodcoop) {
            Ok(Self(foodcoop))
        } else {
            Err(AppError::NotFound(format!("foodcoop {foodcoop}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_path() {
        let scope = Scope("f".to_string());
        assert_eq!(scope.path("/home/profile"), "/f/home/profile");
        assert_eq!(scope.as_str(), "f");
    }
}
