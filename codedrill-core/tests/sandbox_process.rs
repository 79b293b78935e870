//! Subprocess sandbox behavior: output capture, deadlines, and the
//! unconditional scratch-workspace teardown.
//!
//! These tests drive the sandbox with `sh` as the toolchain so they run
//! anywhere; the sandbox itself is toolchain-agnostic.

use std::path::Path;
use std::time::{Duration, Instant};

use codedrill_core::config::SandboxConfig;
use codedrill_core::error::ExecError;
use codedrill_core::sandbox::{ProcessSandbox, Sandbox};
use pretty_assertions::assert_eq;

fn shell_sandbox(scratch_root: &Path, timeout_secs: u64) -> ProcessSandbox {
    ProcessSandbox::new(SandboxConfig {
        program: "sh".to_owned(),
        args: Vec::new(),
        entry_file: "main.sh".to_owned(),
        timeout_secs,
        scratch_root: Some(scratch_root.to_path_buf()),
        ..SandboxConfig::default()
    })
}

fn scratch_entries(root: &Path) -> usize {
    std::fs::read_dir(root).map(|it| it.count()).unwrap_or(0)
}

#[tokio::test]
async fn captures_combined_output() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = shell_sandbox(root.path(), 5);

    let output = sandbox.run("echo out\necho err >&2\n").await.unwrap();
    assert_eq!(output, "out\nerr");
}

#[tokio::test]
async fn nonzero_exit_reports_failure_with_output() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = shell_sandbox(root.path(), 5);

    let err = sandbox.run("echo partial\nexit 7\n").await.unwrap_err();
    match err {
        ExecError::ExecutionFailure { reason, output } => {
            assert!(reason.contains("exited"), "reason: {reason}");
            assert_eq!(output, "partial");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn scratch_is_removed_after_success() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = shell_sandbox(root.path(), 5);

    sandbox.run("echo hi\n").await.unwrap();
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn timeout_kills_the_child_and_removes_scratch() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = shell_sandbox(root.path(), 1);

    let started = Instant::now();
    let err = sandbox.run("sleep 30\n").await.unwrap_err();
    let elapsed = started.elapsed();

    match err {
        ExecError::ExecutionFailure { reason, .. } => {
            assert!(reason.contains("deadline"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Returned promptly after the 1s deadline, not after the sleep.
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(5), "took {elapsed:?}");
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn workspace_write_failure_still_removes_scratch() {
    let root = tempfile::tempdir().unwrap();
    // An entry path whose parent does not exist forces the write to fail
    // after the scratch directory was created.
    let sandbox = ProcessSandbox::new(SandboxConfig {
        program: "sh".to_owned(),
        entry_file: "missing-dir/main.sh".to_owned(),
        scratch_root: Some(root.path().to_path_buf()),
        ..SandboxConfig::default()
    });

    let err = sandbox.run("echo unreachable\n").await.unwrap_err();
    assert!(matches!(err, ExecError::Resource(_)));
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn missing_toolchain_is_an_internal_fault() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = ProcessSandbox::new(SandboxConfig {
        program: "codedrill-no-such-toolchain".to_owned(),
        scratch_root: Some(root.path().to_path_buf()),
        ..SandboxConfig::default()
    });

    let err = sandbox.run("echo hi\n").await.unwrap_err();
    assert!(matches!(err, ExecError::Resource(_)));
    assert_eq!(scratch_entries(root.path()), 0);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_workspaces() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = std::sync::Arc::new(shell_sandbox(root.path(), 5));

    // Each submission echoes its own token after a pause. If two runs shared
    // a workspace, the later entry-file write would clobber the earlier one
    // and a task would report the wrong token.
    let tasks: Vec<_> = (0..4)
        .map(|token| {
            let sandbox = std::sync::Arc::clone(&sandbox);
            tokio::spawn(async move {
                let source = format!("sleep 0.2\necho token-{token}\n");
                sandbox.run(&source).await
            })
        })
        .collect();

    for (token, task) in tasks.into_iter().enumerate() {
        let output = task.await.unwrap().unwrap();
        assert_eq!(output, format!("token-{token}"));
    }
    assert_eq!(scratch_entries(root.path()), 0);
}
