//! Mutation cycles: one filesystem change followed by one serialized reindex.
//!
//! ```text
//! upload: validate name -> check extension -> protected-mode check -> write -> reindex
//! delete: validate name -> lookup -> remove -> reindex
//! ```
//!
//! A failed reindex does not undo the filesystem change. The caller gets a tool
//! failure and has to treat the package set as changed but the index as
//! possibly stale; any later successful cycle repairs the index.

use bytes::Bytes;
use futures_util::Stream;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::indexer::Indexer;
use crate::process::{ProcessOutput, ProcessRunner};
use crate::serializer::{ExclusiveSerializer, MutationSerializer};
use crate::store::RepoStore;
use crate::validate_filename;

/// Suffix every uploaded package must carry (case-sensitive).
pub const PACKAGE_EXTENSION: &str = ".rpm";

/// Outcome of a successful upload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub filename: String,
    pub size: u64,
    /// A package with the same name was overwritten
    pub replaced: bool,
}

/// The package repository together with its metadata index.
pub struct Repository {
    store: RepoStore,
    indexer: Arc<Indexer>,
    serializer: Arc<dyn MutationSerializer>,
    protected: bool,
}

impl Repository {
    pub fn new(
        store: RepoStore,
        indexer: Indexer,
        serializer: Arc<dyn MutationSerializer>,
        protected: bool,
    ) -> Self {
        Self {
            store,
            indexer: Arc::new(indexer),
            serializer,
            protected,
        }
    }

    /// Production wiring: real store, configured tool, process-wide lock.
    pub fn from_config(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(
            RepoStore::new(config.repo_path.clone()),
            Indexer::from_config(config, runner),
            Arc::new(ExclusiveSerializer::new()),
            config.protected,
        )
    }

    pub fn store(&self) -> &RepoStore {
        &self.store
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Checks that run before any byte of an upload is written.
    pub async fn check_upload(&self, filename: &str) -> AppResult<()> {
        validate_filename(filename)?;

        if !has_package_extension(filename) {
            return Err(AppError::UnsupportedMediaType(format!(
                "{filename} uploaded, not an rpm package"
            )));
        }

        // Races benignly with a concurrent upload of the same name.
        if self.protected && self.store.exists(filename).await {
            return Err(AppError::Conflict(format!(
                "{filename} already exists, forbidden to overwrite"
            )));
        }

        Ok(())
    }

    /// Store a package and regenerate the index.
    pub async fn upload<S, E>(&self, filename: &str, content: S) -> AppResult<UploadReceipt>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
        AppError: From<E>,
    {
        self.check_upload(filename).await?;

        let replaced = self.store.exists(filename).await;
        let size = self.store.write(filename, content).await?;
        if replaced {
            info!(filename = %filename, "Existing package overwritten");
        }

        self.reindex()
            .await
            .map_err(|e| e.with_context(&format!("{filename} stored")))?;

        Ok(UploadReceipt {
            filename: filename.to_string(),
            size,
            replaced,
        })
    }

    /// Remove a package and regenerate the index.
    pub async fn delete(&self, filename: &str) -> AppResult<()> {
        validate_filename(filename)?;

        if !self.store.exists(filename).await {
            warn!(filename = %filename, "Delete requested for missing package");
            return Err(AppError::NotFound(format!("{filename} - File not found")));
        }

        self.store.remove(filename).await?;

        self.reindex()
            .await
            .map_err(|e| e.with_context(&format!("{filename} deleted")))?;
        Ok(())
    }

    /// Run one serialized reindex.
    ///
    /// The work is spawned onto its own task so that a client hanging up does
    /// not cancel a reindex that has already been started or is queued behind
    /// the serializer.
    pub async fn reindex(&self) -> AppResult<ProcessOutput> {
        let indexer = self.indexer.clone();
        let serializer = self.serializer.clone();

        tokio::spawn(async move {
            let _guard = serializer.acquire().await;
            indexer.reindex().await
        })
        .await
        .map_err(|e| AppError::InternalError(format!("reindex task failed: {e}")))?
    }
}

/// Whether the filename ends in the package suffix. A bare `.rpm` counts.
pub fn has_package_extension(filename: &str) -> bool {
    filename.ends_with(PACKAGE_EXTENSION)
}
