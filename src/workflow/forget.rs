use super::open_repo;
use crate::cli::ForgetResultsArgs;
use crate::definitions::validate_test_name;
use crate::report::Verbosity;
use crate::results::ResultStore;
use anyhow::Result;

/// Forget every verdict of a test, keeping its (now empty) namespace.
pub fn run_forget_results(args: &ForgetResultsArgs, verbosity: Verbosity) -> Result<i32> {
    validate_test_name(&args.test.name)?;
    let repo = open_repo()?;
    let results = ResultStore::new(&repo, &args.test.name, verbosity);
    let count = results.forget_all()?;
    if verbosity.is_verbose() {
        eprintln!(
            "forgot {count} result(s) of test '{}'",
            results.test_name()
        );
    }
    Ok(0)
}
