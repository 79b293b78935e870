//! Out-of-process sandbox: one scratch directory and one child process per
//! submission, with a hard wall-clock deadline.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::config::SandboxConfig;
use crate::error::ExecError;
use crate::sandbox::Sandbox;

/// Runs submissions by materializing them into an ephemeral workspace and
/// invoking the configured toolchain there.
///
/// The scratch directory is the one resource whose leak would be a
/// correctness bug under load, so its lifetime is tied to a [`TempDir`]
/// guard: removal happens on every exit path, including timeout, early
/// error return, and unwind.
pub struct ProcessSandbox {
    config: SandboxConfig,
}

impl ProcessSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn create_scratch(&self) -> Result<TempDir, ExecError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("codedrill-");
        let scratch = match &self.config.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(scratch)
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn run(&self, source: &str) -> Result<String, ExecError> {
        let scratch = self.create_scratch()?;
        let entry = scratch.path().join(&self.config.entry_file);
        tokio::fs::write(&entry, source).await?;

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(&self.config.entry_file)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on deadline expiry must kill the
            // child, not abandon it.
            .kill_on_drop(true);

        let child = command.spawn()?;
        let started = Instant::now();
        let deadline = self.config.timeout();

        match tokio::time::timeout(deadline, child.wait_with_output()).await {
            Err(_) => Err(ExecError::ExecutionFailure {
                reason: format!(
                    "process killed after exceeding the {}s deadline",
                    self.config.timeout_secs
                ),
                output: String::new(),
            }),
            Ok(Err(io_err)) => Err(ExecError::Resource(io_err)),
            Ok(Ok(output)) => {
                debug!(
                    program = %self.config.program,
                    exit = ?output.status.code(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "submission process finished"
                );
                let combined =
                    combine_streams(&output.stdout, &output.stderr, self.config.max_output_bytes);
                if output.status.success() {
                    Ok(combined)
                } else {
                    Err(ExecError::ExecutionFailure {
                        reason: format!("process exited with {}", output.status),
                        output: combined,
                    })
                }
            }
        }
        // `scratch` drops here on every path above.
    }
}

/// Joins captured stdout and stderr into the single combined stream the
/// verdict reports, capped at `max_bytes`.
fn combine_streams(stdout: &[u8], stderr: &[u8], max_bytes: usize) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);
    if !err.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&err);
    }
    if text.len() > max_bytes {
        let mut cut = max_bytes;
        while cut > 0 && !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text.trim().to_owned()
}
