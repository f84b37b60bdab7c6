//! # Application State Management
//!
//! [`AppState`] is created once during startup and shared with every handler
//! through an `Arc`. Nothing in it is mutated after startup; the only shared
//! mutable resource, the repository directory, is coordinated by
//! [`Repository`](crate::repository::Repository).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use yum_repo_server::{AppState, Config, Repository, TokioProcessRunner};
//!
//! let config = Config::default();
//! let repository = Repository::from_config(&config, Arc::new(TokioProcessRunner));
//! let state = Arc::new(AppState::new(config, repository));
//! ```

use crate::config::Config;
use crate::repository::Repository;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Startup configuration, read-only
    pub config: Arc<Config>,
    /// Package store, metadata gateway and mutation serializer
    pub repository: Arc<Repository>,
}

impl AppState {
    pub fn new(config: Config, repository: Repository) -> Self {
        Self {
            config: Arc::new(config),
            repository: Arc::new(repository),
        }
    }
}

/// Standardized success response for API consistency.
///
/// Serializes to: `{"message": "foo-1.0.rpm uploaded"}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Human-readable success message describing the completed operation
    pub message: String,
}
