//! Seams to the externally-owned repository.
//!
//! The core never talks to git directly: it reads and writes tree
//! annotations, moves the working copy, and reads test definitions through
//! these traits. `crate::git::GitRepo` is the production binding; tests use
//! the in-memory `MemoryRepo`.
use anyhow::Result;
use std::path::Path;

#[cfg(test)]
pub(crate) mod memory;

/// One commit selected for evaluation, with the tree its verdict is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub commit: String,
    pub tree: String,
}

impl Revision {
    pub fn new(commit: impl Into<String>, tree: impl Into<String>) -> Self {
        Self {
            commit: commit.into(),
            tree: tree.into(),
        }
    }

    /// Abbreviated commit id for report lines.
    pub fn short_commit(&self) -> &str {
        let end = self.commit.len().min(12);
        &self.commit[..end]
    }
}

/// What HEAD pointed at before a run started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadRef {
    /// A symbolic ref such as `refs/heads/main`.
    Symbolic(String),
    /// A detached commit id.
    Detached(String),
}

/// Content-addressed tree store with namespaced annotations.
///
/// Annotation writes are force-overwrites and removals ignore objects that
/// carry no annotation.
pub trait TreeStore {
    /// Resolve a revision expression to a commit id.
    fn resolve_commit(&self, rev: &str) -> Result<String>;

    /// Tree id of a commit.
    fn tree_of(&self, commit: &str) -> Result<String>;

    /// Commits reachable from `to` but not from `from`, oldest first.
    fn list_range(&self, from: &str, to: &str) -> Result<Vec<Revision>>;

    /// Id the store assigns to a tree with no entries.
    fn empty_tree(&self) -> Result<String>;

    fn read_note(&self, namespace: &str, object: &str) -> Result<Option<String>>;

    fn write_note(&self, namespace: &str, object: &str, value: &str) -> Result<()>;

    /// Remove annotations for all `objects` in one batch.
    fn remove_notes(&self, namespace: &str, objects: &[String]) -> Result<()>;

    /// Objects that currently carry an annotation in `namespace`.
    fn list_notes(&self, namespace: &str) -> Result<Vec<String>>;

    /// Tree id of the namespace's current state, `None` if it does not exist.
    fn namespace_tree(&self, namespace: &str) -> Result<Option<String>>;

    /// Create the namespace pointing at the empty tree. Returns `false` if it
    /// already existed.
    fn create_namespace(&self, namespace: &str, message: &str) -> Result<bool>;

    /// Delete the namespace, returning the value it held so it can be put back.
    fn delete_namespace(&self, namespace: &str) -> Result<Option<String>>;

    fn restore_namespace(&self, namespace: &str, value: &str) -> Result<()>;
}

/// The materialized checkout the test command runs against.
pub trait WorkingCopy {
    fn head(&self) -> Result<HeadRef>;

    /// `true` when there are no staged or unstaged modifications.
    fn is_clean(&self) -> Result<bool>;

    /// Materialize `commit` (detached).
    fn checkout(&self, commit: &str) -> Result<()>;

    /// Return to what HEAD pointed at before the run.
    fn restore(&self, head: &HeadRef) -> Result<()>;

    /// Directory the test command runs in.
    fn toplevel(&self) -> &Path;
}

/// Key/value configuration holding test definitions.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a whole section. Returns `false` if it did not exist.
    fn unset_section(&self, section: &str) -> Result<bool>;

    /// All `(key, value)` pairs in file order whose key matches `key_pattern`.
    /// Keys without a value are reported with `None`.
    fn entries(&self, key_pattern: &str) -> Result<Vec<(String, Option<String>)>>;
}
