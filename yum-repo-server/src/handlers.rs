//! HTTP handlers for the repository API.
//!
//! Upload and delete are thin: they pull the filename (and for uploads the byte
//! stream) out of the request and hand over to
//! [`Repository`](crate::repository::Repository), which runs the mutation
//! cycle. Errors are rendered by [`AppError`]'s `IntoResponse` impl.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    response::Html,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::help::render_help_file;
use crate::indexer::INDEX_DIR;
use crate::repository::PACKAGE_EXTENSION;
use crate::{AppError, AppResult, AppState, SuccessResponse};

/// Multipart field carrying the package.
pub const UPLOAD_FIELD: &str = "fileupload";

/// Stores an uploaded package and refreshes the repository metadata.
///
/// # Route
/// `POST /api/upload`
///
/// # Request Body
/// `multipart/form-data` with a file field named `fileupload`. Other fields
/// are skipped; only the first `fileupload` field is stored:
///
/// ```text
/// curl -F fileupload=@foo-1.0-1.x86_64.rpm http://repo:8080/api/upload
/// ```
///
/// # Responses
/// - `200` package stored and index regenerated
/// - `400` malformed form, no `fileupload` field or unsafe filename
/// - `403` protected mode and the package already exists
/// - `415` file does not end in `.rpm`
/// - `500` the file could not be written, or it was written but the index
///   update failed
pub async fn upload_package(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<SuccessResponse>> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        if name != UPLOAD_FIELD {
            debug!(field_name = %name, "Skipping multipart field");
            continue;
        }

        let filename = field
            .file_name()
            .ok_or_else(|| AppError::BadRequest("Missing filename in upload".to_string()))?
            .to_string();

        info!(filename = %filename, "Receiving package upload");
        let receipt = state.repository.upload(&filename, field).await?;

        info!(
            filename = %receipt.filename,
            size = receipt.size,
            replaced = receipt.replaced,
            "Package uploaded"
        );
        return Ok(Json(SuccessResponse {
            message: format!("{} uploaded", receipt.filename),
        }));
    }

    Err(AppError::BadRequest(format!("no {UPLOAD_FIELD} field in form")))
}

/// Removes a package and refreshes the repository metadata.
///
/// # Route
/// `DELETE /api/delete/{filename}` (behind the access guard)
///
/// # Responses
/// - `200` package removed and index regenerated
/// - `401` missing or wrong credentials
/// - `404` no such package
/// - `500` removal failed, or the package was removed but the index update failed
pub async fn delete_package(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    info!(filename = %filename, "Deleting package");
    state.repository.delete(&filename).await?;
    info!(filename = %filename, "Package deleted");

    Ok(Json(SuccessResponse {
        message: format!("{filename} deleted"),
    }))
}

/// Renders the configured help document.
///
/// # Route
/// `GET /help`
pub async fn help_handler(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let html = render_help_file(&state.config.help_file).await?;
    debug!("/help requested");
    Ok(Html(html))
}

/// Lists the stored packages.
///
/// # Route
/// `GET /`
pub async fn index_handler(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let repository = &state.repository;
    let packages = repository.store().list(PACKAGE_EXTENSION).await?;

    let mut html = String::from(
        r#"<!DOCTYPE html>
<html>
  <head><title>Package repository</title></head>
  <body>
    <h1>Package repository</h1>
    <pre>
"#,
    );
    if repository.indexer().index_exists() {
        html.push_str(&format!(r#"<a href="{INDEX_DIR}/">{INDEX_DIR}/</a>"#));
        html.push('\n');
    }
    for package in &packages {
        let escaped = escape_html(package);
        html.push_str(&format!(r#"<a href="{escaped}">{escaped}</a>"#));
        html.push('\n');
    }
    html.push_str("    </pre>\n  </body>\n</html>\n");
    Ok(Html(html))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// # Route
/// `GET /health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Service information and package count.
///
/// # Route
/// `GET /api/status`
pub async fn status_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    let repository = &state.repository;
    let packages = repository.store().list(PACKAGE_EXTENSION).await?;

    Ok(Json(json!({
        "status": "ok",
        "service": "yummy",
        "version": env!("CARGO_PKG_VERSION"),
        "repository": repository.store().root().display().to_string(),
        "index_present": repository.indexer().index_exists(),
        "protected": repository.is_protected(),
        "auth_enabled": state.config.auth.enabled,
        "packages": packages.len(),
    })))
}
