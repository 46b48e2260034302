//! Verdict storage keyed by tree.
//!
//! A verdict is an annotation on a tree id in the namespace `tests/<name>`.
//! `Unknown` is the absence of an annotation and is never written.
use crate::error::CorruptVerdictError;
use crate::report::Verbosity;
use crate::store::TreeStore;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt;

/// Stored result of a test on one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Good,
    Bad,
    Unknown,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Good => "good",
            Verdict::Bad => "bad",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a test's namespace exists and holds anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceState {
    Absent,
    Empty,
    HasResults,
}

/// Results namespace for a test name.
pub fn namespace_for(test_name: &str) -> String {
    format!("tests/{test_name}")
}

/// Reads and writes the verdicts of a single test.
pub struct ResultStore<'a, S: TreeStore + ?Sized> {
    store: &'a S,
    test_name: String,
    namespace: String,
    verbosity: Verbosity,
}

impl<'a, S: TreeStore + ?Sized> ResultStore<'a, S> {
    pub fn new(store: &'a S, test_name: &str, verbosity: Verbosity) -> Self {
        Self {
            store,
            test_name: test_name.to_string(),
            namespace: namespace_for(test_name),
            verbosity,
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn read(&self, tree: &str) -> Result<Verdict> {
        let note = self
            .store
            .read_note(&self.namespace, tree)
            .with_context(|| format!("read result for tree {tree}"))?;
        let Some(note) = note else {
            return Ok(Verdict::Unknown);
        };
        match note.trim() {
            "good" => return Ok(Verdict::Good),
            "bad" => return Ok(Verdict::Bad),
            _ => {}
        }
        Err(CorruptVerdictError {
            test: self.test_name.clone(),
            tree: tree.to_string(),
            value: note,
        }
        .into())
    }

    /// Record `verdict` for `tree`, replacing any previous one.
    pub fn write(&self, tree: &str, verdict: Verdict) -> Result<()> {
        if verdict == Verdict::Unknown {
            return Err(anyhow!("refusing to store an unknown verdict for {tree}"));
        }
        self.store
            .write_note(&self.namespace, tree, verdict.as_str())
            .with_context(|| format!("record {verdict} for tree {tree}"))?;
        tracing::info!(test = %self.test_name, tree, %verdict, "recorded verdict");
        if self.verbosity.is_verbose() {
            eprintln!(
                "recorded {verdict} for tree {tree} (test '{}')",
                self.test_name
            );
        }
        Ok(())
    }

    /// Drop the verdicts of `trees`; trees without one are ignored.
    pub fn forget(&self, trees: &[String]) -> Result<()> {
        if trees.is_empty() {
            return Ok(());
        }
        self.store
            .remove_notes(&self.namespace, trees)
            .with_context(|| format!("forget results of test '{}'", self.test_name))?;
        tracing::info!(test = %self.test_name, count = trees.len(), "forgot verdicts");
        Ok(())
    }

    /// Drop every verdict the test has.
    pub fn forget_all(&self) -> Result<usize> {
        let trees = self
            .store
            .list_notes(&self.namespace)
            .with_context(|| format!("list results of test '{}'", self.test_name))?;
        self.forget(&trees)?;
        Ok(trees.len())
    }

    /// Create the namespace with no results if it does not exist yet.
    pub fn initialize(&self, message: &str) -> Result<bool> {
        self.store
            .create_namespace(&self.namespace, message)
            .with_context(|| format!("initialize results of test '{}'", self.test_name))
    }

    /// Replace the namespace with a fresh empty one.
    pub fn reset(&self, message: &str) -> Result<()> {
        self.store.delete_namespace(&self.namespace)?;
        self.initialize(message)?;
        Ok(())
    }

    pub fn state(&self) -> Result<NamespaceState> {
        let Some(tree) = self.store.namespace_tree(&self.namespace)? else {
            return Ok(NamespaceState::Absent);
        };
        if tree == self.store.empty_tree()? {
            Ok(NamespaceState::Empty)
        } else {
            Ok(NamespaceState::HasResults)
        }
    }

    /// Delete the namespace, returning its previous value.
    pub fn delete(&self) -> Result<Option<String>> {
        self.store
            .delete_namespace(&self.namespace)
            .with_context(|| format!("delete results of test '{}'", self.test_name))
    }

    pub fn restore(&self, value: &str) -> Result<()> {
        self.store.restore_namespace(&self.namespace, value)
    }
}
