//! Upload of BNN article files.
//!
//! BNN is the article-list format of German organic wholesalers. Members
//! upload the files here; they are stored under
//! `<upload_dir>/<foodcoop>/<uuid>.bnn` for later import. The content is not
//! parsed.

use std::path::{Path, PathBuf};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;
use uuid::Uuid;

use super::{Plugin, PluginError};
use crate::config::{AppConfig, Features};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireUser, set_notice};
use crate::routes::Page;
use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Lets members upload BNN files. Enabled by default once registered.
pub struct BnnUploadPlugin;

impl Plugin for BnnUploadPlugin {
    fn name(&self) -> &'static str {
        "bnn_upload"
    }

    fn default_config(&self, features: &mut Features) {
        features.use_bnn_upload = true;
    }

    fn prepare(&self, config: &AppConfig) -> std::result::Result<(), PluginError> {
        if !config.features.use_bnn_upload {
            return Ok(());
        }
        if config.upload_dir.exists() && !config.upload_dir.is_dir() {
            return Err(PluginError::Invalid {
                plugin: self.name(),
                reason: format!("{} is not a directory", config.upload_dir.display()),
            });
        }
        std::fs::create_dir_all(&config.upload_dir).map_err(|source| PluginError::Io {
            plugin: self.name(),
            source,
        })
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/bnn_upload", get(show_form).post(upload))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
    }
}

/// Upload form.
#[derive(Template, WebTemplate)]
#[template(path = "plugins/bnn_upload.html")]
pub struct BnnUploadTemplate {
    pub page: Page,
    pub error: Option<String>,
}

fn ensure_enabled(state: &AppState) -> Result<()> {
    if state.features().use_bnn_upload {
        Ok(())
    } else {
        Err(AppError::NotFound("bnn upload".to_string()))
    }
}

/// Display the upload form.
async fn show_form(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
) -> Result<BnnUploadTemplate> {
    ensure_enabled(&state)?;

    Ok(BnnUploadTemplate {
        page: Page::new(&state, &scope, Some(&user), &session).await,
        error: None,
    })
}

/// Store an uploaded file.
async fn upload(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response> {
    ensure_enabled(&state)?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = display_name(field.file_name().unwrap_or_default());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        file = Some((name, data));
    }

    let checked = file
        .ok_or("Please choose a file.")
        .and_then(|(name, data)| check_upload(&name, &data).map(|()| (name, data)));

    let (name, data) = match checked {
        Ok(file) => file,
        Err(message) => {
            let template = BnnUploadTemplate {
                page: Page::new(&state, &scope, Some(&user), &session).await,
                error: Some(message.to_string()),
            };
            return Ok(template.into_response());
        }
    };

    let path = store_upload(&state.config().upload_dir, scope.as_str(), &data)
        .await
        .map_err(|e| AppError::Internal(format!("storing upload: {e}")))?;

    tracing::info!(
        user_id = %user.id,
        scope = scope.as_str(),
        file = %name,
        path = %path.display(),
        bytes = data.len(),
        "BNN file uploaded"
    );
    add_breadcrumb("upload", "BNN file uploaded", &[("file", &name)]);

    set_notice(&session, format!("File {name} uploaded.")).await?;
    Ok(Redirect::to(&scope.path("/bnn_upload")).into_response())
}

/// The client-side file name without any directory part.
fn display_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Check name and content of an upload; returns the message shown to the member.
fn check_upload(name: &str, data: &[u8]) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("Please choose a file.");
    }
    let is_bnn = Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bnn"));
    if !is_bnn {
        return Err("Only .bnn files can be uploaded.");
    }
    if data.is_empty() {
        return Err("The file is empty.");
    }
    Ok(())
}

/// Write `data` to a fresh file below `root/scope`.
async fn store_upload(root: &Path, scope: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    let dir = root.join(scope);
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(format!("{}.bnn", Uuid::new_v4()));
    tokio::fs::write(&path, data).await?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_upload() {
        assert!(check_upload("artikel.bnn", b"data").is_ok());
        assert!(check_upload("ARTIKEL.BNN", b"data").is_ok());
        assert_eq!(
            check_upload("artikel.csv", b"data"),
            Err("Only .bnn files can be uploaded.")
        );
        assert_eq!(check_upload("artikel.bnn", b""), Err("The file is empty."));
        assert_eq!(check_upload("", b"data"), Err("Please choose a file."));
        assert!(check_upload("bnn", b"data").is_err());
    }

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name("C:\\Users\\me\\liste.bnn"), "liste.bnn");
        assert_eq!(display_name("../../etc/liste.bnn"), "liste.bnn");
        assert_eq!(display_name("liste.bnn"), "liste.bnn");
    }

    #[tokio::test]
    async fn test_store_upload_writes_below_scope() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_upload(dir.path(), "f", b"BNN;3.0").await.unwrap();

        assert!(path.starts_with(dir.path().join("f")));
        assert_eq!(path.extension().unwrap(), "bnn");
        assert_eq!(std::fs::read(&path).unwrap(), b"BNN;3.0");
    }

    #[test]
    fn test_prepare_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let target = upload_dir.to_string_lossy().into_owned();
        let plugins = crate::plugins::PluginRegistry::new().with(BnnUploadPlugin);
        let config = AppConfig::from_lookup(&plugins, |key| match key {
            "FOODCOOP_DATABASE_URL" => Some("postgres://localhost/foodcoop".to_string()),
            "FOODCOOP_UPLOAD_DIR" => Some(target.clone()),
            _ => None,
        })
        .unwrap();

        BnnUploadPlugin.prepare(&config).unwrap();
        assert!(upload_dir.is_dir());
    }

    #[test]
    fn test_prepare_rejects_file_as_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let occupied = dir.path().join("uploads");
        std::fs::write(&occupied, b"not a directory").unwrap();
        let target = occupied.to_string_lossy().into_owned();
        let plugins = crate::plugins::PluginRegistry::new().with(BnnUploadPlugin);
        let config = AppConfig::from_lookup(&plugins, |key| match key {
            "FOODCOOP_DATABASE_URL" => Some("postgres://localhost/foodcoop".to_string()),
            "FOODCOOP_UPLOAD_DIR" => Some(target.clone()),
            _ => None,
        })
        .unwrap();

        let err = BnnUploadPlugin.prepare(&config).unwrap_err();
        assert!(matches!(err, PluginError::Invalid { plugin: "bnn_upload", .. }));
        assert!(err.to_string().ends_with("is not a directory"));
    }
}
