//! Subcommand entrypoints.
//!
//! Each step opens the repository, hands off to the domain modules, and
//! returns the process exit code.
mod add;
mod forget;
mod list;
mod remove;
mod results;
mod run;

pub use add::run_add;
pub use forget::run_forget_results;
pub use list::run_list;
pub use remove::run_remove;
pub use results::run_results;
pub use run::run_run;

use crate::git::GitRepo;
use crate::revisions::{self, RevisionRequest};
use anyhow::{Context, Result};

/// Open the repository containing the current directory.
fn open_repo() -> Result<GitRepo> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    GitRepo::discover(&cwd)
}

/// Revisions named on stdin, when `--stdin` was given.
fn stdin_revisions(request: &RevisionRequest) -> Result<Vec<String>> {
    if !request.stdin {
        return Ok(Vec::new());
    }
    revisions::read_revision_lines(std::io::stdin().lock())
}
