use super::{open_repo, stdin_revisions};
use crate::cli::RunArgs;
use crate::definitions::validate_test_name;
use crate::engine::{RunEngine, ShellExecutor};
use crate::report::Verbosity;
use crate::revisions::{self, RevisionRequest};
use anyhow::Result;

/// Run the test over the requested revisions; the exit code is the run's
/// aggregate result.
pub fn run_run(args: &RunArgs, verbosity: Verbosity) -> Result<i32> {
    validate_test_name(&args.test.name)?;
    let request = RevisionRequest::parse(&args.revisions, args.stdin)?;
    let repo = open_repo()?;
    let stdin = stdin_revisions(&request)?;
    let selection = revisions::expand(&repo, &request, &stdin)?;

    let mut executor = ShellExecutor::locate()?;
    let mut engine = RunEngine::new(
        &repo,
        &args.test.name,
        &mut executor,
        args.options(),
        verbosity,
    );
    let summary = engine.run(selection)?;
    tracing::debug!(
        test = %args.test.name,
        trees = summary.reports.len(),
        failures = summary.aggregate.fail_count,
        unknown = summary.aggregate.unknown_count,
        stopped_early = summary.stopped_early,
        working_tree = ?summary.working_tree,
        exit_code = summary.exit_code,
        "run finished"
    );
    if summary.failure_checked_out && !verbosity.is_quiet() {
        if let Some(report) = summary.reports.last() {
            eprintln!(
                "stopped at {}; it is still checked out",
                report.revision.short_commit()
            );
        }
    }
    Ok(summary.exit_code)
}
