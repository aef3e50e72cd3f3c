//! Integration tests for the foodcoop dashboard.
//!
//! The tests drive the complete router in-process: the application is
//! assembled exactly as in `main`, but on an in-memory store and session
//! backend, so no database or network is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p foodcoop-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tower::ServiceExt;

use foodcoop_core::{Email, GroupKind};
use foodcoop_web::app;
use foodcoop_web::config::AppConfig;
use foodcoop_web::db::{FinancialTransactionStore, GroupStore, MemoryStore, Store, UserStore};
use foodcoop_web::models::financial_transaction::NewFinancialTransaction;
use foodcoop_web::models::{FinancialTransaction, Group, NewUser, User};
use foodcoop_web::plugins::{BnnUploadPlugin, PluginRegistry};
use foodcoop_web::services::auth::hash_password;
use foodcoop_web::state::AppState;

/// Scope every test app serves first.
pub const SCOPE: &str = "f";

/// Second scope, for cross-scope checks.
pub const OTHER_SCOPE: &str = "demo";

/// Password of every seeded member.
pub const PASSWORD: &str = "vegetables";

/// A response with the body read into a string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The redirect target, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Assert a 303 redirect to `path`.
    pub fn assert_redirect_to(&self, path: &str) {
        assert_eq!(
            self.status,
            StatusCode::SEE_OTHER,
            "expected redirect to {path}, body: {}",
            self.body
        );
        assert_eq!(self.location(), Some(path));
    }
}

/// The dashboard wired to in-memory backends, with a cookie jar of one.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub upload_dir: TempDir,
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    /// An app with the BNN upload plugin registered and enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// An app with extra environment variables, e.g. feature overrides.
    #[must_use]
    pub fn with_env(vars: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().to_string_lossy().into_owned();
        let scopes = format!("{SCOPE},{OTHER_SCOPE}");

        let mut env: Vec<(String, String)> = vec![
            ("FOODCOOP_DATABASE_URL".into(), "postgres://unused/foodcoop".into()),
            ("FOODCOOP_SCOPES".into(), scopes),
            ("FOODCOOP_UPLOAD_DIR".into(), upload_path),
            ("FOODCOOP_BANK_NAME".into(), "Coop Bank".into()),
            ("FOODCOOP_BANK_IBAN".into(), "DE02120300000000202051".into()),
        ];
        env.extend(vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));

        let plugins = PluginRegistry::new().with(BnnUploadPlugin);
        let config = AppConfig::from_lookup(&plugins, |key| {
            env.iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap();
        plugins.prepare_all(&config).unwrap();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, Arc::clone(&store) as Arc<dyn Store>);
        let router = app::router(state, &plugins, tower_sessions::MemoryStore::default());

        Self {
            store,
            upload_dir,
            router,
            cookie: None,
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send a request, keeping the session cookie up to date.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
        {
            self.cookie = if set_cookie.contains("Max-Age=0") {
                None
            } else {
                set_cookie.split(';').next().map(str::to_owned)
            };
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.form(Method::POST, uri, fields).await
    }

    pub async fn patch_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.form(Method::PATCH, uri, fields).await
    }

    async fn form(
        &mut self,
        method: Method,
        uri: &str,
        fields: &[(&str, &str)],
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode_form(fields)))
            .unwrap();
        self.send(request).await
    }

    /// Post a single file as `multipart/form-data`.
    pub async fn post_file(
        &mut self,
        uri: &str,
        field: &str,
        file_name: &str,
        content: &[u8],
    ) -> TestResponse {
        const BOUNDARY: &str = "foodcoop-test-boundary";

        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Log in to `scope` and assert it worked.
    pub async fn login(&mut self, scope: &str, email: &str) {
        let response = self
            .post_form(
                &format!("/{scope}/login"),
                &[("email", email), ("password", PASSWORD)],
            )
            .await;
        response.assert_redirect_to(&format!("/{scope}/home"));
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Create a member with [`PASSWORD`].
    pub async fn create_member(&self, first_name: &str, email: &str) -> User {
        self.store
            .create_user(&NewUser {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                email: Email::parse(email).unwrap(),
                phone: None,
                password_hash: hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap()
    }

    pub async fn create_group(&self, name: &str, kind: GroupKind) -> Group {
        self.store.create_group(name, kind, None).await.unwrap()
    }

    pub async fn join(&self, user: &User, group: &Group) {
        self.store.add_membership(user.id, group.id).await.unwrap();
    }

    pub async fn book(
        &self,
        ordergroup: &Group,
        user: &User,
        note: &str,
        amount: Decimal,
        created_on: DateTime<Utc>,
    ) -> FinancialTransaction {
        self.store
            .create_transaction(&NewFinancialTransaction {
                ordergroup_id: ordergroup.id,
                user_id: user.id,
                note: note.to_string(),
                amount,
                created_on: Some(created_on),
            })
            .await
            .unwrap()
    }

    pub async fn reload(&self, user: &User) -> User {
        self.store.get_user(user.id).await.unwrap().unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode fields as `application/x-www-form-urlencoded`.
#[must_use]
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `data-transaction-id` values in document order.
#[must_use]
pub fn transaction_ids(body: &str) -> Vec<i32> {
    body.split("data-transaction-id=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter_map(|id| id.parse().ok())
        .collect()
}
