//! Expansion of revision arguments into the ordered list of trees to test.
//!
//! Positional tokens are expanded first, each range flattened before the next
//! token, then revisions read from stdin are appended. Only the first
//! occurrence of each tree is kept.
use crate::error::UsageError;
use crate::store::{Revision, TreeStore};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::BufRead;

/// One positional revision argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionToken {
    Single(String),
    Range { from: String, to: String },
}

impl RevisionToken {
    /// Parse `REV` or `A..B`; an empty side of a range means `HEAD`.
    pub fn parse(token: &str) -> Result<Self> {
        if token.contains("...") {
            return Err(UsageError::new(format!(
                "symmetric-difference range {token:?} is not supported"
            ))
            .into());
        }
        let parts: Vec<&str> = token.split("..").collect();
        match parts.as_slice() {
            [single] => Ok(RevisionToken::Single((*single).to_string())),
            [from, to] => Ok(RevisionToken::Range {
                from: or_head(from),
                to: or_head(to),
            }),
            _ => Err(UsageError::new(format!("invalid revision range {token:?}")).into()),
        }
    }
}

fn or_head(side: &str) -> String {
    if side.is_empty() {
        "HEAD".to_string()
    } else {
        side.to_string()
    }
}

/// Parsed revision arguments, validated before anything touches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRequest {
    pub tokens: Vec<RevisionToken>,
    pub stdin: bool,
}

impl RevisionRequest {
    pub fn parse(args: &[String], stdin: bool) -> Result<Self> {
        let tokens = args
            .iter()
            .map(|arg| RevisionToken::parse(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tokens, stdin })
    }

    /// Nothing was named explicitly: test the current checkout.
    pub fn is_working_copy(&self) -> bool {
        self.tokens.is_empty() && !self.stdin
    }
}

/// What a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The current checkout, which may carry uncommitted changes.
    WorkingCopy,
    Revisions(Vec<Revision>),
}

/// Read one revision per non-blank line.
pub fn read_revision_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut revisions = Vec::new();
    for line in reader.lines() {
        let line = line.context("read revisions from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            revisions.push(line.to_string());
        }
    }
    Ok(revisions)
}

/// Expand `request` into the trees to evaluate.
pub fn expand<S: TreeStore + ?Sized>(
    store: &S,
    request: &RevisionRequest,
    stdin_revisions: &[String],
) -> Result<Selection> {
    if request.is_working_copy() {
        return Ok(Selection::WorkingCopy);
    }
    let mut seen = HashSet::new();
    let mut revisions = Vec::new();
    let mut keep = |revision: Revision| {
        if seen.insert(revision.tree.clone()) {
            revisions.push(revision);
        }
    };
    for token in &request.tokens {
        match token {
            RevisionToken::Single(rev) => keep(resolve(store, rev)?),
            RevisionToken::Range { from, to } => {
                for revision in store.list_range(from, to)? {
                    keep(revision);
                }
            }
        }
    }
    for rev in stdin_revisions {
        keep(resolve(store, rev)?);
    }
    tracing::debug!(count = revisions.len(), "expanded revisions");
    Ok(Selection::Revisions(revisions))
}

/// Resolve a single revision to its commit and tree.
pub fn resolve<S: TreeStore + ?Sized>(store: &S, rev: &str) -> Result<Revision> {
    let commit = store.resolve_commit(rev)?;
    let tree = store.tree_of(&commit)?;
    Ok(Revision::new(commit, tree))
}
