//! External process invocation.
//!
//! The metadata tool is only ever reached through [`ProcessRunner`], so tests
//! can swap in a fake that records invocations instead of spawning processes.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit status, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Standard output followed by standard error
    pub combined_output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run a command to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args` in `cwd` and wait for it to exit.
    ///
    /// An `Err` means the process could not be started at all.
    async fn run(&self, program: &Path, args: &[OsString], cwd: &Path) -> io::Result<ProcessOutput>;
}

/// Runs commands as child processes of the server.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &Path, args: &[OsString], cwd: &Path) -> io::Result<ProcessOutput> {
        debug!(program = %program.display(), args = ?args, cwd = %cwd.display(), "Spawning process");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut combined_output = String::from_utf8_lossy(&output.stdout).into_owned();
        combined_output.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            combined_output,
        })
    }
}
