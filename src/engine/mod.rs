//! Run engine.
//!
//! Walks the selected trees, reuses stored verdicts where allowed, runs the
//! test command where needed, records what it learns, and folds every
//! per-tree outcome into the run's exit code.
mod aggregate;
mod exec;

pub use aggregate::{decide, Action, Aggregate, Flow, TreeOutcome};
pub use exec::{ShellExecutor, TestExecutor, TestInvocation};

use crate::definitions::Test;
use crate::error::UsageError;
use crate::report::{self, Verbosity};
use crate::results::{ResultStore, Verdict};
use crate::revisions::{self, Selection};
use crate::store::{ConfigStore, HeadRef, Revision, TreeStore, WorkingCopy};
use anyhow::Result;

/// Flags governing one `run` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Forget the whole selection's verdicts, then test everything.
    pub force: bool,
    /// Forget the whole selection's verdicts and stop.
    pub forget: bool,
    /// Re-test trees whose stored verdict is bad.
    pub retest: bool,
    /// Report stored verdicts without running anything.
    pub dry_run: bool,
    /// Continue past failures.
    pub keep_going: bool,
}

impl RunOptions {
    fn executes(&self) -> bool {
        !self.forget && !self.dry_run
    }
}

/// Outcome for one tree of the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeReport {
    pub revision: Revision,
    pub outcome: TreeOutcome,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<TreeReport>,
    /// Set when uncommitted working-copy content was tested instead of trees.
    pub working_tree: Option<bool>,
    pub aggregate: Aggregate,
    /// The run stopped at a failure instead of finishing the selection.
    pub stopped_early: bool,
    /// The failing commit is what the working copy now holds.
    pub failure_checked_out: bool,
    pub exit_code: i32,
}

/// Drives one test over a selection of trees.
pub struct RunEngine<'a, R, E>
where
    R: TreeStore + WorkingCopy + ConfigStore + ?Sized,
    E: TestExecutor + ?Sized,
{
    repo: &'a R,
    test: Test<'a, R>,
    results: ResultStore<'a, R>,
    executor: &'a mut E,
    options: RunOptions,
    verbosity: Verbosity,
}

impl<'a, R, E> RunEngine<'a, R, E>
where
    R: TreeStore + WorkingCopy + ConfigStore + ?Sized,
    E: TestExecutor + ?Sized,
{
    pub fn new(
        repo: &'a R,
        test_name: &str,
        executor: &'a mut E,
        options: RunOptions,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            repo,
            test: Test::new(repo, test_name),
            results: ResultStore::new(repo, test_name, verbosity),
            executor,
            options,
            verbosity,
        }
    }

    pub fn run(&mut self, selection: Selection) -> Result<RunSummary> {
        match selection {
            Selection::WorkingCopy => {
                if !self.repo.is_clean()? {
                    return self.run_dirty_working_copy();
                }
                let head = revisions::resolve(self.repo, "HEAD")?;
                self.run_revisions(vec![head], false)
            }
            Selection::Revisions(revisions) => self.run_revisions(revisions, true),
        }
    }

    /// Test uncommitted content once. Nothing is recorded: the content has
    /// no tree id.
    fn run_dirty_working_copy(&mut self) -> Result<RunSummary> {
        if self.options.forget || self.options.dry_run {
            return Err(UsageError::new(
                "--forget and --dry-run operate on committed revisions, \
                 but the working copy has uncommitted changes",
            )
            .into());
        }
        tracing::debug!(test = self.test.name(), "testing dirty working copy");
        let command = self.test.command()?;
        let code = self.executor.execute(&TestInvocation {
            test_name: self.test.name(),
            command,
            workdir: self.repo.toplevel(),
            verbosity: self.verbosity,
            revision: None,
            previous_tree: None,
        })?;
        let passed = code == 0;
        report::print_working_tree(self.verbosity, passed);
        Ok(RunSummary {
            working_tree: Some(passed),
            exit_code: code,
            ..RunSummary::default()
        })
    }

    fn run_revisions(&mut self, revisions: Vec<Revision>, materialize: bool) -> Result<RunSummary> {
        let options = self.options;
        let checks_out = materialize && options.executes() && !revisions.is_empty();
        if checks_out && !self.repo.is_clean()? {
            return Err(UsageError::new(
                "the working copy has uncommitted changes; \
                 commit or stash them before testing other revisions",
            )
            .into());
        }

        if options.force || options.forget {
            let trees: Vec<String> = revisions
                .iter()
                .map(|revision| revision.tree.clone())
                .collect();
            self.results.forget(&trees)?;
            if options.forget {
                return Ok(RunSummary::default());
            }
        }

        let original_head = if checks_out {
            Some(self.repo.head()?)
        } else {
            None
        };
        let mut summary = RunSummary::default();
        let mut switched = false;
        let mut previous_tree: Option<String> = None;

        for revision in revisions {
            let verdict = self.results.read(&revision.tree)?;
            let action = decide(verdict, options.retest, options.dry_run);
            tracing::debug!(
                commit = %revision.commit,
                tree = %revision.tree,
                %verdict,
                ?action,
                "decided"
            );
            let outcome = match action {
                Action::ReuseGood => TreeOutcome::KnownGood,
                Action::ReuseBad => TreeOutcome::KnownBad,
                Action::SkipDryRun => TreeOutcome::Unknown,
                Action::Execute => {
                    let command = self.test.command()?;
                    if materialize {
                        self.repo.checkout(&revision.commit)?;
                        switched = true;
                    }
                    let code = self.executor.execute(&TestInvocation {
                        test_name: self.test.name(),
                        command,
                        workdir: self.repo.toplevel(),
                        verbosity: self.verbosity,
                        revision: Some(&revision),
                        previous_tree: previous_tree.as_deref(),
                    })?;
                    previous_tree = Some(revision.tree.clone());
                    if code == 0 {
                        self.results.write(&revision.tree, Verdict::Good)?;
                        TreeOutcome::Good
                    } else {
                        self.results.write(&revision.tree, Verdict::Bad)?;
                        TreeOutcome::Bad(code)
                    }
                }
            };
            report::print_tree(self.verbosity, &revision, outcome);
            let (aggregate, flow) = summary.aggregate.advance(outcome, options.keep_going);
            summary.aggregate = aggregate;
            if let Flow::Stop(code) = flow {
                if outcome == TreeOutcome::KnownBad && switched {
                    // An earlier passing tree is checked out; move to the failure.
                    self.repo.checkout(&revision.commit)?;
                }
                summary.failure_checked_out = switched || matches!(outcome, TreeOutcome::Bad(_));
                summary.reports.push(TreeReport { revision, outcome });
                summary.stopped_early = true;
                summary.exit_code = code;
                return Ok(summary);
            }
            summary.reports.push(TreeReport { revision, outcome });
        }

        if switched {
            if let Some(head) = original_head.as_ref() {
                self.restore(head)?;
            }
        }
        summary.exit_code = summary.aggregate.exit_code(options.dry_run);
        Ok(summary)
    }

    fn restore(&self, head: &HeadRef) -> Result<()> {
        tracing::debug!(?head, "restoring original checkout");
        self.repo.restore(head)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
