mod cli;
mod definitions;
mod engine;
mod error;
mod git;
mod report;
mod results;
mod revisions;
mod store;
mod workflow;

use clap::Parser;
use cli::{Command, RootArgs};
use error::{exit_code_for, USAGE_EXIT_CODE};
use report::Verbosity;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "GIT_TEST_LOG";

fn main() -> ExitCode {
    let args = match RootArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { USAGE_EXIT_CODE } else { 0 };
            // Nothing useful remains to report if the terminal is gone.
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let result = match &args.command {
        Command::Add(add) => workflow::run_add(add, verbosity),
        Command::Run(run) => workflow::run_run(run, verbosity),
        Command::Results(results) => workflow::run_results(results, verbosity),
        Command::ForgetResults(forget) => workflow::run_forget_results(forget, verbosity),
        Command::List(list) => workflow::run_list(list),
        Command::Remove(remove) => workflow::run_remove(remove, verbosity),
    };
    match result {
        Ok(code) => ExitCode::from(process_exit_code(code)),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.log_level().into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Exit codes outside `0..=255` cannot be reported faithfully; they count as
/// a generic failure.
fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
