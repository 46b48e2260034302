//! Error classification and process exit codes.
//!
//! Everything fallible returns `anyhow::Result`; the few errors that must be
//! told apart at the top level are typed leaves that `main` finds by walking
//! the error chain.
use std::fmt;

/// Exit code for fatal tool failures (store, checkout, corrupt data).
pub const FATAL_EXIT_CODE: u8 = 128;
/// Exit code for usage errors, detected before anything is mutated.
pub const USAGE_EXIT_CODE: u8 = 129;

/// A request that cannot be honored as given (bad range syntax, conflicting
/// flags for the current working copy, invalid test name).
#[derive(Debug)]
pub struct UsageError {
    message: String,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for UsageError {}

/// A stored annotation whose value is neither `good` nor `bad`.
#[derive(Debug)]
pub struct CorruptVerdictError {
    pub test: String,
    pub tree: String,
    pub value: String,
}

impl fmt::Display for CorruptVerdictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "corrupt result for test '{}' on tree {}: {:?} (expected \"good\" or \"bad\")",
            self.test, self.tree, self.value
        )
    }
}

impl std::error::Error for CorruptVerdictError {}

/// Map an error chain to the reserved exit code for its class.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let is_usage = err
        .chain()
        .any(|cause| cause.downcast_ref::<UsageError>().is_some());
    if is_usage {
        USAGE_EXIT_CODE
    } else {
        FATAL_EXIT_CODE
    }
}
