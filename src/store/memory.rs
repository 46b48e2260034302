use super::{ConfigStore, HeadRef, Revision, TreeStore, WorkingCopy};
use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const MEMORY_EMPTY_TREE: &str = "tree-empty";
const MAIN_BRANCH: &str = "refs/heads/main";

/// In-memory repository with a linear history `c1..cN`.
pub(crate) struct MemoryRepo {
    commits: Vec<Revision>,
    notes: RefCell<BTreeMap<String, BTreeMap<String, String>>>,
    config: RefCell<Vec<(String, Option<String>)>>,
    head: RefCell<HeadRef>,
    clean: Cell<bool>,
    checkouts: RefCell<Vec<String>>,
    note_writes: Cell<usize>,
    fail_config_unset: Cell<bool>,
    failing_note: RefCell<Option<String>>,
    failing_checkout: RefCell<Option<String>>,
    root: PathBuf,
}

impl MemoryRepo {
    pub(crate) fn linear(count: usize) -> Self {
        let commits = (1..=count)
            .map(|idx| Revision::new(format!("commit-{idx:02}"), format!("tree-{idx:02}")))
            .collect();
        Self {
            commits,
            notes: RefCell::new(BTreeMap::new()),
            config: RefCell::new(Vec::new()),
            head: RefCell::new(HeadRef::Symbolic(MAIN_BRANCH.to_string())),
            clean: Cell::new(true),
            checkouts: RefCell::new(Vec::new()),
            note_writes: Cell::new(0),
            fail_config_unset: Cell::new(false),
            failing_note: RefCell::new(None),
            failing_checkout: RefCell::new(None),
            root: PathBuf::from("/memory"),
        }
    }

    /// Give commit `idx` (1-based) the same tree as commit `same_as`.
    pub(crate) fn share_tree(mut self, idx: usize, same_as: usize) -> Self {
        let tree = self.commits[same_as - 1].tree.clone();
        self.commits[idx - 1].tree = tree;
        self
    }

    pub(crate) fn revision(&self, idx: usize) -> Revision {
        self.commits[idx - 1].clone()
    }

    pub(crate) fn set_clean(&self, clean: bool) {
        self.clean.set(clean);
    }

    pub(crate) fn fail_config_unset(&self) {
        self.fail_config_unset.set(true);
    }

    /// Make writing a note on `object` fail.
    pub(crate) fn fail_note_write(&self, object: &str) {
        *self.failing_note.borrow_mut() = Some(object.to_string());
    }

    /// Make checking out `commit` fail.
    pub(crate) fn fail_checkout(&self, commit: &str) {
        *self.failing_checkout.borrow_mut() = Some(commit.to_string());
    }

    pub(crate) fn set_note(&self, namespace: &str, object: &str, value: &str) {
        self.notes
            .borrow_mut()
            .entry(namespace.to_string())
            .or_default()
            .insert(object.to_string(), value.to_string());
    }

    pub(crate) fn note(&self, namespace: &str, object: &str) -> Option<String> {
        self.notes
            .borrow()
            .get(namespace)
            .and_then(|notes| notes.get(object).cloned())
    }

    pub(crate) fn has_namespace(&self, namespace: &str) -> bool {
        self.notes.borrow().contains_key(namespace)
    }

    pub(crate) fn note_writes(&self) -> usize {
        self.note_writes.get()
    }

    pub(crate) fn checkouts(&self) -> Vec<String> {
        self.checkouts.borrow().clone()
    }

    pub(crate) fn current_head(&self) -> HeadRef {
        self.head.borrow().clone()
    }

    fn position(&self, rev: &str) -> Result<usize> {
        let rev = if rev == "HEAD" {
            match &*self.head.borrow() {
                HeadRef::Symbolic(_) => return Ok(self.commits.len()),
                HeadRef::Detached(commit) => commit.clone(),
            }
        } else {
            rev.to_string()
        };
        if let Some(idx) = rev.strip_prefix('c').and_then(|n| n.parse::<usize>().ok()) {
            if (1..=self.commits.len()).contains(&idx) {
                return Ok(idx);
            }
        }
        self.commits
            .iter()
            .position(|revision| revision.commit == rev)
            .map(|pos| pos + 1)
            .ok_or_else(|| anyhow!("{rev} is not a valid commit"))
    }
}

impl TreeStore for MemoryRepo {
    fn resolve_commit(&self, rev: &str) -> Result<String> {
        let idx = self.position(rev)?;
        Ok(self.commits[idx - 1].commit.clone())
    }

    fn tree_of(&self, commit: &str) -> Result<String> {
        let idx = self.position(commit)?;
        Ok(self.commits[idx - 1].tree.clone())
    }

    fn list_range(&self, from: &str, to: &str) -> Result<Vec<Revision>> {
        let start = self.position(from)?;
        let end = self.position(to)?;
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(self.commits[start..end].to_vec())
    }

    fn empty_tree(&self) -> Result<String> {
        Ok(MEMORY_EMPTY_TREE.to_string())
    }

    fn read_note(&self, namespace: &str, object: &str) -> Result<Option<String>> {
        Ok(self.note(namespace, object))
    }

    fn write_note(&self, namespace: &str, object: &str, value: &str) -> Result<()> {
        if self.failing_note.borrow().as_deref() == Some(object) {
            return Err(anyhow!("cannot lock notes ref for {object}"));
        }
        self.note_writes.set(self.note_writes.get() + 1);
        self.set_note(namespace, object, value);
        Ok(())
    }

    fn remove_notes(&self, namespace: &str, objects: &[String]) -> Result<()> {
        if let Some(notes) = self.notes.borrow_mut().get_mut(namespace) {
            for object in objects {
                notes.remove(object);
            }
        }
        Ok(())
    }

    fn list_notes(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .notes
            .borrow()
            .get(namespace)
            .map(|notes| notes.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn namespace_tree(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self.notes.borrow().get(namespace).map(|notes| {
            if notes.is_empty() {
                MEMORY_EMPTY_TREE.to_string()
            } else {
                format!("notes-tree-{}", notes.len())
            }
        }))
    }

    fn create_namespace(&self, namespace: &str, _message: &str) -> Result<bool> {
        let mut notes = self.notes.borrow_mut();
        if notes.contains_key(namespace) {
            return Ok(false);
        }
        notes.insert(namespace.to_string(), BTreeMap::new());
        Ok(true)
    }

    fn delete_namespace(&self, namespace: &str) -> Result<Option<String>> {
        let removed = self.notes.borrow_mut().remove(namespace);
        Ok(removed.map(|notes| serde_json::to_string(&notes).unwrap_or_default()))
    }

    fn restore_namespace(&self, namespace: &str, value: &str) -> Result<()> {
        let notes: BTreeMap<String, String> = serde_json::from_str(value)?;
        self.notes.borrow_mut().insert(namespace.to_string(), notes);
        Ok(())
    }
}

impl WorkingCopy for MemoryRepo {
    fn head(&self) -> Result<HeadRef> {
        Ok(self.head.borrow().clone())
    }

    fn is_clean(&self) -> Result<bool> {
        Ok(self.clean.get())
    }

    fn checkout(&self, commit: &str) -> Result<()> {
        self.position(commit)?;
        if self.failing_checkout.borrow().as_deref() == Some(commit) {
            return Err(anyhow!("checkout of {commit} would overwrite local changes"));
        }
        self.checkouts.borrow_mut().push(commit.to_string());
        *self.head.borrow_mut() = HeadRef::Detached(commit.to_string());
        Ok(())
    }

    fn restore(&self, head: &HeadRef) -> Result<()> {
        *self.head.borrow_mut() = head.clone();
        Ok(())
    }

    fn toplevel(&self) -> &Path {
        &self.root
    }
}

impl ConfigStore for MemoryRepo {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .config
            .borrow()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.config.borrow_mut();
        match config.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = Some(value.to_string()),
            None => config.push((key.to_string(), Some(value.to_string()))),
        }
        Ok(())
    }

    fn unset_section(&self, section: &str) -> Result<bool> {
        if self.fail_config_unset.get() {
            return Err(anyhow!("config is locked"));
        }
        let prefix = format!("{section}.");
        let mut config = self.config.borrow_mut();
        let before = config.len();
        config.retain(|(k, _)| !k.starts_with(&prefix));
        Ok(config.len() != before)
    }

    fn entries(&self, key_pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        let pattern = regex::Regex::new(key_pattern)?;
        Ok(self
            .config
            .borrow()
            .iter()
            .filter(|(k, _)| pattern.is_match(k))
            .cloned()
            .collect())
    }
}

impl MemoryRepo {
    /// Insert a raw config entry, including malformed ones.
    pub(crate) fn push_config(&self, key: &str, value: Option<&str>) {
        self.config
            .borrow_mut()
            .push((key.to_string(), value.map(|v| v.to_string())));
    }
}
