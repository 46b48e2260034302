//! Thin driver for the `git` executable.
//!
//! Every call is a blocking subprocess with `LC_ALL=C` so that stderr can be
//! classified; argv is logged at debug level.
mod repo;

pub use repo::GitRepo;

use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Captured result of a git invocation that is allowed to fail.
pub(crate) struct GitOutput {
    pub(crate) success: bool,
    pub(crate) code: Option<i32>,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

/// Located git executable bound to a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    workdir: PathBuf,
}

impl Git {
    /// Locate `git` on `PATH` and bind it to `workdir`.
    pub fn locate(workdir: &Path) -> Result<Self> {
        let program = which::which("git").context("locate git executable on PATH")?;
        Ok(Self {
            program,
            workdir: workdir.to_path_buf(),
        })
    }

    fn command(&self, args: &[&str]) -> Command {
        tracing::debug!(argv = %render_argv(args), "git");
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .env("LANGUAGE", "C");
        cmd
    }

    /// Run git and return stdout; any non-zero exit is an error.
    pub(crate) fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.try_run(args)?;
        if !output.success {
            return Err(failure(args, &output));
        }
        Ok(output.stdout)
    }

    /// Run git feeding `input` on stdin; any non-zero exit is an error.
    pub(crate) fn run_with_input(&self, args: &[&str], input: &str) -> Result<String> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn git {}", render_argv(args)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("write stdin of git {}", render_argv(args)))?;
        }
        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for git {}", render_argv(args)))?;
        let output = GitOutput::from(output);
        if !output.success {
            return Err(failure(args, &output));
        }
        Ok(output.stdout)
    }

    /// Run git and hand back the outcome, successful or not.
    pub(crate) fn try_run(&self, args: &[&str]) -> Result<GitOutput> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawn git {}", render_argv(args)))?;
        Ok(GitOutput::from(output))
    }

    /// Run a query whose only failure mode is "no answer" (exit 1).
    pub(crate) fn query(&self, args: &[&str]) -> Result<Option<String>> {
        let output = self.try_run(args)?;
        match output.code {
            Some(0) => Ok(Some(output.stdout.trim_end().to_string())),
            Some(1) => Ok(None),
            _ => Err(failure(args, &output)),
        }
    }
}

impl From<Output> for GitOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

fn render_argv(args: &[&str]) -> String {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("git");
    argv.extend_from_slice(args);
    shell_words::join(argv)
}

fn failure(args: &[&str], output: &GitOutput) -> anyhow::Error {
    let status = match output.code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    };
    anyhow!(
        "{} failed (exit {}): {}",
        render_argv(args),
        status,
        output.stderr.trim()
    )
}
