//! Running the user's test command.
use crate::report::Verbosity;
use crate::store::Revision;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;

pub const VERBOSITY_ENV: &str = "GIT_TEST_VERBOSITY";
pub const TEST_NAME_ENV: &str = "GIT_TEST_NAME";
pub const PREVIOUS_TREE_ENV: &str = "GIT_TEST_PREVIOUS_TREE";

/// Everything the command needs for one execution.
pub struct TestInvocation<'a> {
    pub test_name: &'a str,
    pub command: &'a str,
    pub workdir: &'a Path,
    pub verbosity: Verbosity,
    /// `None` when testing uncommitted working-copy content.
    pub revision: Option<&'a Revision>,
    /// Tree tested just before this one in the same run.
    pub previous_tree: Option<&'a str>,
}

/// Runs a test command against the materialized working copy and reports
/// its exit code. A failing command is not an error.
pub trait TestExecutor {
    fn execute(&mut self, invocation: &TestInvocation<'_>) -> Result<i32>;
}

/// Executes commands with `sh -c`.
pub struct ShellExecutor {
    shell: PathBuf,
}

impl ShellExecutor {
    pub fn locate() -> Result<Self> {
        let shell = which::which("sh").context("locate sh on PATH")?;
        Ok(Self { shell })
    }
}

impl TestExecutor for ShellExecutor {
    fn execute(&mut self, invocation: &TestInvocation<'_>) -> Result<i32> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(invocation.command)
            .current_dir(invocation.workdir)
            .stdin(Stdio::null())
            .env(VERBOSITY_ENV, invocation.verbosity.0.to_string())
            .env(TEST_NAME_ENV, invocation.test_name)
            .env(PREVIOUS_TREE_ENV, invocation.previous_tree.unwrap_or(""));

        let started = Instant::now();
        let status = if invocation.verbosity.is_verbose() {
            cmd.status()
                .with_context(|| format!("spawn test '{}'", invocation.test_name))?
        } else {
            let output = cmd
                .output()
                .with_context(|| format!("spawn test '{}'", invocation.test_name))?;
            if !output.status.success() {
                replay_output(&output.stdout, &output.stderr);
            }
            output.status
        };
        let code = exit_code(status);
        tracing::info!(
            test = invocation.test_name,
            tree = invocation.revision.map(|revision| revision.tree.as_str()),
            code,
            elapsed_ms = started.elapsed().as_millis(),
            "test command finished"
        );
        Ok(code)
    }
}

fn replay_output(stdout: &[u8], stderr: &[u8]) {
    let mut sink = std::io::stderr().lock();
    // Replay errors are ignored; the exit code still reports the failure.
    let _ = sink.write_all(stdout);
    let _ = sink.write_all(stderr);
    let _ = sink.flush();
}

/// Exit code of a finished command; a signal death maps to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_exit_code(status).unwrap_or(1)
}

#[cfg(unix)]
fn signal_exit_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: ExitStatus) -> Option<i32> {
    None
}
