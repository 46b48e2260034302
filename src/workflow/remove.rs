use super::open_repo;
use crate::cli::RemoveArgs;
use crate::definitions::remove_test;
use crate::report::Verbosity;
use anyhow::Result;

pub fn run_remove(args: &RemoveArgs, verbosity: Verbosity) -> Result<i32> {
    let repo = open_repo()?;
    remove_test(&repo, &args.test.name, verbosity)?;
    if verbosity.is_verbose() {
        eprintln!("removed test '{}'", args.test.name);
    }
    Ok(0)
}
