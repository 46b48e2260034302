//! CLI argument parsing for `git test`.
//!
//! Parsing only; every policy decision lives in the workflow and engine
//! modules.
use crate::definitions::{ResultsPolicy, DEFAULT_TEST_NAME};
use crate::engine::RunOptions;
use crate::report::Verbosity;
use clap::{ArgAction, Args, Parser, Subcommand};

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "git-test",
    bin_name = "git test",
    version,
    about = "Run tests against commits and remember the results by tree",
    after_help = "Examples:\n  git test add 'make -j8 check'\n  git test run main..feature\n  git test run -t lint --keep-going HEAD~5..\n  git test results --json main..\n  git log --format=%H main.. | git test run --stdin",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Show more output; repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Show less output; repeat for less
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl RootArgs {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Add(AddArgs),
    Run(RunArgs),
    Results(ResultsArgs),
    ForgetResults(ForgetResultsArgs),
    List(ListArgs),
    Remove(RemoveArgs),
}

/// Selects the test a command operates on.
#[derive(Args, Debug, Clone)]
pub struct TestNameArg {
    /// Name of the test
    #[arg(short = 't', long = "test", value_name = "NAME", default_value = DEFAULT_TEST_NAME)]
    pub name: String,
}

#[derive(Parser, Debug)]
#[command(about = "Define a test, or change the command of an existing one")]
pub struct AddArgs {
    #[command(flatten)]
    pub test: TestNameArg,

    /// Keep results from an earlier definition without warning
    #[arg(long, conflicts_with = "forget")]
    pub keep: bool,

    /// Discard results from an earlier definition
    #[arg(long)]
    pub forget: bool,

    /// Shell command that exits 0 when a tree is good
    #[arg(value_name = "COMMAND")]
    pub command: String,
}

impl AddArgs {
    pub fn policy(&self) -> ResultsPolicy {
        if self.forget {
            ResultsPolicy::Forget
        } else if self.keep {
            ResultsPolicy::Keep
        } else {
            ResultsPolicy::Warn
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run a test against revisions, reusing recorded results")]
pub struct RunArgs {
    #[command(flatten)]
    pub test: TestNameArg,

    /// Forget recorded results for the revisions, then test them all
    #[arg(short, long)]
    pub force: bool,

    /// Forget recorded results for the revisions without testing
    #[arg(long, conflicts_with_all = ["force", "retest", "dry_run"])]
    pub forget: bool,

    /// Test again revisions that are recorded as bad
    #[arg(short, long)]
    pub retest: bool,

    /// Continue past failing revisions
    #[arg(short, long)]
    pub keep_going: bool,

    /// Report recorded results without running anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Read additional revisions from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// Revisions or ranges (A..B); defaults to the working copy
    #[arg(value_name = "REV")]
    pub revisions: Vec<String>,
}

impl RunArgs {
    pub fn options(&self) -> RunOptions {
        RunOptions {
            force: self.force,
            forget: self.forget,
            retest: self.retest,
            dry_run: self.dry_run,
            keep_going: self.keep_going,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Show recorded results without running anything")]
pub struct ResultsArgs {
    #[command(flatten)]
    pub test: TestNameArg,

    /// Read additional revisions from stdin, one per line
    #[arg(long)]
    pub stdin: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Revisions or ranges (A..B); defaults to HEAD
    #[arg(value_name = "REV")]
    pub revisions: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Forget every recorded result of a test")]
pub struct ForgetResultsArgs {
    #[command(flatten)]
    pub test: TestNameArg,
}

#[derive(Parser, Debug)]
#[command(about = "List defined tests")]
pub struct ListArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove a test definition and its recorded results")]
pub struct RemoveArgs {
    #[command(flatten)]
    pub test: TestNameArg,
}
