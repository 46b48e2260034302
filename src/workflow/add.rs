use super::open_repo;
use crate::cli::AddArgs;
use crate::definitions::{add_test, AddOutcome};
use crate::report::Verbosity;
use anyhow::Result;

pub fn run_add(args: &AddArgs, verbosity: Verbosity) -> Result<i32> {
    let repo = open_repo()?;
    let outcome = add_test(&repo, &args.test.name, &args.command, args.policy(), verbosity)?;
    if verbosity.is_verbose() {
        let message = match outcome {
            AddOutcome::Initialized => "defined",
            AddOutcome::Kept | AddOutcome::KeptWithWarning => "redefined, keeping results of",
            AddOutcome::Reset => "redefined, forgetting results of",
        };
        eprintln!("{message} test '{}'", args.test.name);
    }
    Ok(0)
}
