//! Gateway to the repository metadata tool (`createrepo`).
//!
//! The metadata directory is derived data: it is never read here, only
//! regenerated wholesale by the external tool. Output of the tool is kept as an
//! opaque blob for diagnostics.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::process::{ProcessOutput, ProcessRunner};

/// Directory the metadata tool generates inside the repository.
pub const INDEX_DIR: &str = "repodata";

/// What startup initialisation found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// An index was already present and left alone
    Existing,
    /// No index existed and a full build was run
    Created,
}

/// Invokes the metadata tool against one repository directory.
pub struct Indexer {
    runner: Arc<dyn ProcessRunner>,
    binary: PathBuf,
    repo_path: PathBuf,
    workers: u32,
}

impl Indexer {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        binary: impl Into<PathBuf>,
        repo_path: impl Into<PathBuf>,
        workers: u32,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            repo_path: repo_path.into(),
            workers,
        }
    }

    pub fn from_config(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(
            runner,
            config.createrepo_binary.clone(),
            config.repo_path.clone(),
            config.workers,
        )
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Whether the metadata directory exists.
    pub fn index_exists(&self) -> bool {
        self.repo_path.join(INDEX_DIR).is_dir()
    }

    /// Arguments for an incremental update.
    pub fn update_args(&self) -> Vec<OsString> {
        vec![
            "--update".into(),
            "--workers".into(),
            self.workers.to_string().into(),
            self.repo_path.clone().into_os_string(),
        ]
    }

    /// Arguments for a full build from scratch.
    pub fn full_build_args(&self) -> Vec<OsString> {
        vec![
            "--workers".into(),
            self.workers.to_string().into(),
            self.repo_path.clone().into_os_string(),
        ]
    }

    /// Regenerate the index so it matches the current package set.
    ///
    /// Not guarded against concurrent calls; go through the mutation
    /// serializer. Running it twice without a change in between is harmless.
    pub async fn reindex(&self) -> AppResult<ProcessOutput> {
        self.invoke(self.update_args(), "update").await
    }

    /// Build the index from scratch when none exists yet, otherwise do nothing.
    ///
    /// Runs once before the server accepts traffic.
    pub async fn initialize(&self) -> AppResult<InitOutcome> {
        if self.index_exists() {
            info!(repo = %self.repo_path.display(), "Using existing repository");
            return Ok(InitOutcome::Existing);
        }

        info!(repo = %self.repo_path.display(), "Initialising empty repository");
        self.invoke(self.full_build_args(), "full build").await?;
        Ok(InitOutcome::Created)
    }

    async fn invoke(&self, args: Vec<OsString>, mode: &str) -> AppResult<ProcessOutput> {
        let started = Instant::now();
        info!(binary = %self.binary.display(), args = ?args, mode, "Running metadata tool");

        let output = self
            .runner
            .run(&self.binary, &args, &self.repo_path)
            .await
            .map_err(|e| {
                error!(binary = %self.binary.display(), error = %e, "Could not start metadata tool");
                AppError::ToolFailure {
                    message: format!(
                        "could not start {}: {e}",
                        self.binary.display()
                    ),
                    exit_code: None,
                    output: String::new(),
                }
            })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !output.success() {
            error!(
                binary = %self.binary.display(),
                exit_code = ?output.exit_code,
                elapsed_ms,
                output = %output.combined_output,
                "Metadata tool failed"
            );
            let status = output
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(AppError::ToolFailure {
                message: format!(
                    "Could not update repository: {} exited with status {status}",
                    self.binary.display()
                ),
                exit_code: output.exit_code,
                output: output.combined_output,
            });
        }

        info!(mode, elapsed_ms, "Repository metadata updated");
        debug!(output = %output.combined_output, "Metadata tool output");
        Ok(output)
    }
}
