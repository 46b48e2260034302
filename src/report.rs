//! Human-readable output.
//!
//! Verdict lines go to stdout so they can be piped; notices and warnings go
//! to stderr.
use crate::engine::TreeOutcome;
use crate::store::Revision;
use tracing::level_filters::LevelFilter;

/// Output chattiness, threaded explicitly instead of living in globals.
///
/// Negative is quiet, zero is normal, positive is verbose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbosity(pub i32);

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        Self(i32::from(verbose) - i32::from(quiet))
    }

    pub fn is_quiet(self) -> bool {
        self.0 < 0
    }

    pub fn is_verbose(self) -> bool {
        self.0 > 0
    }

    /// Default log level when `GIT_TEST_LOG` is unset.
    pub fn log_level(self) -> LevelFilter {
        match self.0 {
            i32::MIN..=0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            _ => LevelFilter::DEBUG,
        }
    }
}

pub fn tree_line(revision: &Revision, outcome: TreeOutcome) -> String {
    format!("{} {}", revision.short_commit(), outcome.label())
}

pub fn working_tree_line(passed: bool) -> String {
    let label = if passed { "good" } else { "bad" };
    format!("working-tree {label}")
}

pub fn print_tree(verbosity: Verbosity, revision: &Revision, outcome: TreeOutcome) {
    if !verbosity.is_quiet() {
        println!("{}", tree_line(revision, outcome));
    }
}

pub fn print_working_tree(verbosity: Verbosity, passed: bool) {
    if !verbosity.is_quiet() {
        println!("{}", working_tree_line(passed));
    }
}

pub fn warn(message: &str) {
    eprintln!("warning: {message}");
}
