//! Router assembly.
//!
//! Kept apart from `main` so tests can drive the complete application with
//! an in-memory store and session backend.

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::plugins::PluginRegistry;
use crate::routes;
use crate::state::AppState;

/// Directory of the stylesheet and other static assets.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the complete application router.
///
/// Plugin routes are merged into the foodcoop scope next to the dashboard.
pub fn router<S>(state: AppState, plugins: &PluginRegistry, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(sessions, state.config());
    let scoped = routes::scoped_routes().merge(plugins.routes());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest("/{foodcoop}", scoped)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::db::MemoryStore;

    fn test_router() -> Router {
        let plugins = PluginRegistry::new();
        let config = AppConfig::from_lookup(&plugins, |key| {
            (key == "FOODCOOP_DATABASE_URL").then(|| "postgres://unused/foodcoop".to_string())
        })
        .unwrap();
        let state = AppState::new(config, Arc::new(MemoryStore::new()));
        router(state, &plugins, tower_sessions::MemoryStore::default())
    }

    async fn get(path: &str) -> axum::response::Response {
        test_router()
            .oneshot(axum::http::Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_readiness_pings_store() {
        assert_eq!(get("/health/ready").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unregistered_plugin_routes_are_absent() {
        assert_eq!(get("/f/bnn_upload").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_scope() {
        assert_eq!(get("/elsewhere").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get("/f").await.headers().get("location").unwrap(),
            "/f/home"
        );
    }
}
