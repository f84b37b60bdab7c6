//! Common test utilities and helpers
//!
//! Builds a full router over a temporary repository directory with a fake
//! metadata tool, so the HTTP surface can be exercised without `createrepo`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use yum_repo_server::{
    build_router, AppState, AuthConfig, Config, ExclusiveSerializer, Indexer, ProcessOutput,
    ProcessRunner, RepoStore, Repository,
};

pub const TEST_USER: &str = "admin";
pub const TEST_PASSWORD: &str = "hunter2";

/// Fake metadata tool counting invocations and tracking how many ran at once.
#[derive(Debug, Default)]
pub struct CountingRunner {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Duration,
    exit_code: i32,
    output: String,
}

impl CountingRunner {
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Each invocation sleeps for `delay` while counted as in flight.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(exit_code: i32, output: &str) -> Self {
        Self {
            exit_code,
            output: output.to_string(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for CountingRunner {
    async fn run(
        &self,
        _program: &Path,
        _args: &[OsString],
        _cwd: &Path,
    ) -> io::Result<ProcessOutput> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(ProcessOutput {
            exit_code: Some(self.exit_code),
            combined_output: self.output.clone(),
        })
    }
}

/// Knobs for [`create_test_setup`].
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub protected: bool,
    pub auth_enabled: bool,
    pub protect_upload: bool,
    pub max_upload_size_mb: Option<usize>,
}

/// Test server setup result
pub struct TestSetup {
    pub temp_dir: TempDir,
    pub repo_path: PathBuf,
    pub runner: Arc<CountingRunner>,
    pub state: Arc<AppState>,
    pub server: TestServer,
}

impl TestSetup {
    pub fn package_path(&self, filename: &str) -> PathBuf {
        self.repo_path.join(filename)
    }
}

/// Repository with authentication enabled and everything else at defaults.
pub fn create_test_setup() -> TestSetup {
    create_test_setup_with(
        SetupOptions {
            auth_enabled: true,
            ..SetupOptions::default()
        },
        CountingRunner::succeeding(),
    )
}

pub fn create_test_setup_with(options: SetupOptions, runner: CountingRunner) -> TestSetup {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo_path = temp_dir.path().join("repo");
    fs::create_dir_all(&repo_path).expect("Failed to create repo dir");

    let help_file = temp_dir.path().join("help.md");
    fs::write(
        &help_file,
        "# Yum repository\n\nUpload with `curl -F fileupload=@pkg.rpm`.\n",
    )
    .expect("Failed to write help file");

    let mut config = Config {
        repo_path: repo_path.clone(),
        createrepo_binary: PathBuf::from("/usr/bin/createrepo"),
        help_file,
        protected: options.protected,
        auth: AuthConfig {
            enabled: options.auth_enabled,
            user: TEST_USER.to_string(),
            password: TEST_PASSWORD.to_string(),
            protect_upload: options.protect_upload,
        },
        ..Config::default()
    };
    if let Some(limit) = options.max_upload_size_mb {
        config.max_upload_size_mb = limit;
    }

    let runner = Arc::new(runner);
    let repository = Repository::new(
        RepoStore::new(&repo_path),
        Indexer::from_config(&config, runner.clone()),
        Arc::new(ExclusiveSerializer::new()),
        config.protected,
    );
    let state = Arc::new(AppState::new(config, repository));
    let server = TestServer::new(build_router(state.clone())).expect("Failed to create test server");

    TestSetup {
        temp_dir,
        repo_path,
        runner,
        state,
        server,
    }
}

/// Multipart form with one file part.
pub fn upload_form(field: &str, filename: &str, content: impl Into<Vec<u8>>) -> MultipartForm {
    let part = Part::bytes(content.into())
        .file_name(filename)
        .mime_type("application/x-rpm");
    MultipartForm::new().add_part(field.to_string(), part)
}

/// `Authorization` header value for the given credentials.
pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

pub fn valid_auth() -> String {
    basic_auth(TEST_USER, TEST_PASSWORD)
}
