//! # Yum Repository Server
//!
//! An HTTP front end for a yum/RPM repository directory. Clients upload and
//! delete `.rpm` packages over a small JSON API; after every change the
//! repository metadata is regenerated by the external `createrepo` tool, and
//! the directory itself (packages plus `repodata/`) is served read-only so yum
//! clients can consume it directly.
//!
//! ## Key Modules
//!
//! - [`config`]: Configuration file, environment overrides and validation
//! - [`repository`]: The upload/delete mutation cycle
//! - [`indexer`]: Gateway to the metadata tool
//! - [`serializer`]: Mutual exclusion between reindex runs
//! - [`store`]: Package files on disk
//! - [`auth`]: Basic-auth guard for mutating routes
//! - [`server`]: Router assembly and startup
//! - [`error`]: Error handling and standardized responses

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod help;
pub mod indexer;
pub mod process;
pub mod repository;
pub mod serializer;
pub mod server;
pub mod state;
pub mod store;

pub use config::{AuthConfig, Config};
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use indexer::{Indexer, InitOutcome};
pub use process::{ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use repository::{Repository, UploadReceipt};
pub use serializer::{ExclusiveSerializer, MutationSerializer, NoopSerializer};
pub use server::{build_router, prepare_state, run_server, serve};
pub use state::{AppState, SuccessResponse};
pub use store::RepoStore;

/// Longest filename accepted, matching common filesystem limits.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Check that a client-supplied filename names a single entry directly inside
/// the repository directory.
///
/// Rejects empty names, names over [`MAX_FILENAME_LENGTH`] bytes, NUL and
/// other control characters, parent directory references and path separators
/// of either flavour.
///
/// # Examples
///
/// ```rust
/// # use yum_repo_server::{validate_filename, AppError};
/// assert!(validate_filename("foo-1.0-1.x86_64.rpm").is_ok());
/// assert!(validate_filename("../etc/passwd").is_err());
/// assert!(validate_filename("/absolute/path.rpm").is_err());
/// assert!(validate_filename("sub/dir.rpm").is_err());
/// assert!(validate_filename("file\0name").is_err());
/// ```
pub fn validate_filename(filename: &str) -> Result<(), AppError> {
    if filename.is_empty() {
        tracing::warn!("Empty filename provided");
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    if filename.len() > MAX_FILENAME_LENGTH {
        tracing::warn!(filename = %filename, length = filename.len(), "Filename too long");
        return Err(AppError::BadRequest(format!(
            "Filename too long: {} characters (max: {})",
            filename.len(),
            MAX_FILENAME_LENGTH
        )));
    }

    if filename.contains('\0') {
        tracing::warn!(filename = %filename, "Null byte detected in filename");
        return Err(AppError::BadRequest(
            "Filename contains null byte".to_string(),
        ));
    }

    if filename.chars().any(|c| c.is_control()) {
        tracing::warn!(filename = %filename, "Control character detected in filename");
        return Err(AppError::BadRequest(
            "Filename contains control characters".to_string(),
        ));
    }

    if filename.contains("..") {
        tracing::warn!(filename = %filename, "Path traversal attempt detected (..)");
        return Err(AppError::BadRequest(
            "Filename contains parent directory reference (..)".to_string(),
        ));
    }

    if filename.contains('/') || filename.contains('\\') {
        tracing::warn!(filename = %filename, "Path separator detected in filename");
        return Err(AppError::BadRequest(
            "Filename cannot contain path separators".to_string(),
        ));
    }

    Ok(())
}
