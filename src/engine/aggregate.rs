//! Per-tree decisions and the run-wide outcome they accumulate into.
//!
//! Both steps are pure so the stop/continue rules can be checked without a
//! repository or a test command.
use crate::results::Verdict;

/// What to do with one tree given its stored verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReuseGood,
    ReuseBad,
    Execute,
    SkipDryRun,
}

/// Pick the action for a tree. A bad verdict under `retest` is treated as
/// unknown; good verdicts are always reused.
pub fn decide(verdict: Verdict, retest: bool, dry_run: bool) -> Action {
    match verdict {
        Verdict::Good => Action::ReuseGood,
        Verdict::Bad if !retest => Action::ReuseBad,
        Verdict::Bad | Verdict::Unknown => {
            if dry_run {
                Action::SkipDryRun
            } else {
                Action::Execute
            }
        }
    }
}

/// Result of acting on one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOutcome {
    KnownGood,
    KnownBad,
    Good,
    /// The test command ran and failed with this exit code.
    Bad(i32),
    Unknown,
}

impl TreeOutcome {
    pub fn label(self) -> &'static str {
        match self {
            TreeOutcome::KnownGood => "known-good",
            TreeOutcome::KnownBad => "known-bad",
            TreeOutcome::Good => "good",
            TreeOutcome::Bad(_) => "bad",
            TreeOutcome::Unknown => "unknown",
        }
    }
}

/// Whether the run goes on after a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop now and exit with this code.
    Stop(i32),
}

/// Counters carried across the revision sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub fail_count: usize,
    pub unknown_count: usize,
    /// Exit code of the freshly run failure, while it is still the most
    /// recent outcome. Any later outcome clears it.
    pub last_failure_code: Option<i32>,
}

impl Aggregate {
    pub fn advance(self, outcome: TreeOutcome, keep_going: bool) -> (Self, Flow) {
        let mut next = Self {
            last_failure_code: None,
            ..self
        };
        let flow = match outcome {
            TreeOutcome::KnownGood | TreeOutcome::Good => Flow::Continue,
            TreeOutcome::Unknown => {
                next.unknown_count += 1;
                Flow::Continue
            }
            TreeOutcome::KnownBad => {
                next.fail_count += 1;
                if keep_going {
                    Flow::Continue
                } else {
                    Flow::Stop(1)
                }
            }
            TreeOutcome::Bad(code) => {
                next.fail_count += 1;
                next.last_failure_code = Some(code);
                if keep_going {
                    Flow::Continue
                } else {
                    Flow::Stop(code)
                }
            }
        };
        (next, flow)
    }

    /// Exit code once the whole sequence has been evaluated.
    pub fn exit_code(&self, dry_run: bool) -> i32 {
        if let Some(code) = self.last_failure_code {
            return code;
        }
        if self.fail_count > 0 {
            return 1;
        }
        if dry_run && self.unknown_count > 0 {
            return 2;
        }
        0
    }
}
