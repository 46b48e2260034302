use super::Git;
use crate::store::{ConfigStore, HeadRef, Revision, TreeStore, WorkingCopy};
use anyhow::{anyhow, Context, Result};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// A git repository addressed through the `git` executable.
pub struct GitRepo {
    git: Git,
    toplevel: PathBuf,
    empty_tree: OnceCell<String>,
}

impl GitRepo {
    /// Open the repository containing `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let probe = Git::locate(dir)?;
        let toplevel = probe
            .query(&["rev-parse", "--show-toplevel"])?
            .filter(|path| !path.is_empty())
            .ok_or_else(|| anyhow!("{} is not inside a git working tree", dir.display()))?;
        let toplevel = PathBuf::from(toplevel);
        let git = Git::locate(&toplevel)?;
        tracing::debug!(toplevel = %toplevel.display(), "opened repository");
        Ok(Self {
            git,
            toplevel,
            empty_tree: OnceCell::new(),
        })
    }

    fn ns_ref(namespace: &str) -> String {
        format!("refs/notes/{namespace}")
    }
}

impl TreeStore for GitRepo {
    fn resolve_commit(&self, rev: &str) -> Result<String> {
        let spec = format!("{rev}^{{commit}}");
        self.git
            .query(&["rev-parse", "--verify", "-q", &spec])?
            .ok_or_else(|| anyhow!("{rev} is not a valid commit"))
    }

    fn tree_of(&self, commit: &str) -> Result<String> {
        let spec = format!("{commit}^{{tree}}");
        self.git
            .query(&["rev-parse", "--verify", "-q", &spec])?
            .ok_or_else(|| anyhow!("{commit} has no tree"))
    }

    fn list_range(&self, from: &str, to: &str) -> Result<Vec<Revision>> {
        let range = format!("{from}..{to}");
        let stdout = self
            .git
            .run(&[
                "log",
                "--reverse",
                "--topo-order",
                "--no-color",
                "--format=%H %T",
                &range,
                "--",
            ])
            .with_context(|| format!("list revisions in {range}"))?;
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (commit, tree) = line
                    .split_once(' ')
                    .ok_or_else(|| anyhow!("unexpected git log line: {line:?}"))?;
                Ok(Revision::new(commit, tree))
            })
            .collect()
    }

    fn empty_tree(&self) -> Result<String> {
        if let Some(tree) = self.empty_tree.get() {
            return Ok(tree.clone());
        }
        let tree = self
            .git
            .run_with_input(&["hash-object", "-t", "tree", "--stdin"], "")
            .context("compute empty tree id")?
            .trim()
            .to_string();
        Ok(self.empty_tree.get_or_init(|| tree).clone())
    }

    fn read_note(&self, namespace: &str, object: &str) -> Result<Option<String>> {
        let args = ["notes", "--ref", namespace, "show", object];
        let output = self.git.try_run(&args)?;
        if output.success {
            return Ok(Some(output.stdout.trim_end().to_string()));
        }
        if output.stderr.contains("no note found") {
            return Ok(None);
        }
        Err(anyhow!(
            "read note {object} in {namespace}: {}",
            output.stderr.trim()
        ))
    }

    fn write_note(&self, namespace: &str, object: &str, value: &str) -> Result<()> {
        self.git
            .run(&["notes", "--ref", namespace, "add", "-f", "-m", value, object])
            .with_context(|| format!("write note {object} in {namespace}"))?;
        Ok(())
    }

    fn remove_notes(&self, namespace: &str, objects: &[String]) -> Result<()> {
        if objects.is_empty() || self.namespace_tree(namespace)?.is_none() {
            return Ok(());
        }
        let mut input = objects.join("\n");
        input.push('\n');
        self.git
            .run_with_input(
                &[
                    "notes",
                    "--ref",
                    namespace,
                    "remove",
                    "--ignore-missing",
                    "--stdin",
                ],
                &input,
            )
            .with_context(|| format!("remove {} notes in {namespace}", objects.len()))?;
        Ok(())
    }

    fn list_notes(&self, namespace: &str) -> Result<Vec<String>> {
        if self.namespace_tree(namespace)?.is_none() {
            return Ok(Vec::new());
        }
        let stdout = self.git.run(&["notes", "--ref", namespace, "list"])?;
        Ok(stdout
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(|object| object.to_string())
            .collect())
    }

    fn namespace_tree(&self, namespace: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{tree}}", Self::ns_ref(namespace));
        self.git.query(&["rev-parse", "--verify", "-q", &spec])
    }

    fn create_namespace(&self, namespace: &str, message: &str) -> Result<bool> {
        if self.namespace_tree(namespace)?.is_some() {
            return Ok(false);
        }
        let empty_tree = self.empty_tree()?;
        let commit = self
            .git
            .run(&["commit-tree", &empty_tree, "-m", message])
            .context("create empty results commit")?
            .trim()
            .to_string();
        let refname = Self::ns_ref(namespace);
        let output = self
            .git
            .try_run(&["update-ref", "-m", message, &refname, &commit, ""])?;
        if output.success {
            return Ok(true);
        }
        if self.namespace_tree(namespace)?.is_some() {
            return Ok(false);
        }
        Err(anyhow!("create {refname}: {}", output.stderr.trim()))
    }

    fn delete_namespace(&self, namespace: &str) -> Result<Option<String>> {
        let refname = Self::ns_ref(namespace);
        let Some(old) = self.git.query(&["rev-parse", "--verify", "-q", &refname])? else {
            return Ok(None);
        };
        self.git
            .run(&["update-ref", "-d", &refname, &old])
            .with_context(|| format!("delete {refname}"))?;
        Ok(Some(old))
    }

    fn restore_namespace(&self, namespace: &str, value: &str) -> Result<()> {
        let refname = Self::ns_ref(namespace);
        self.git
            .run(&["update-ref", &refname, value])
            .with_context(|| format!("restore {refname}"))?;
        Ok(())
    }
}

impl WorkingCopy for GitRepo {
    fn head(&self) -> Result<HeadRef> {
        if let Some(symbolic) = self.git.query(&["symbolic-ref", "-q", "HEAD"])? {
            return Ok(HeadRef::Symbolic(symbolic));
        }
        let commit = self.git.run(&["rev-parse", "--verify", "HEAD"])?;
        Ok(HeadRef::Detached(commit.trim().to_string()))
    }

    fn is_clean(&self) -> Result<bool> {
        // Refresh stat info so touched-but-unchanged files do not count.
        self.git.try_run(&["update-index", "-q", "--refresh"])?;
        let staged = self
            .git
            .query(&["diff-index", "--quiet", "--cached", "HEAD", "--"])?;
        if staged.is_none() {
            return Ok(false);
        }
        let unstaged = self.git.query(&["diff-files", "--quiet"])?;
        Ok(unstaged.is_some())
    }

    fn checkout(&self, commit: &str) -> Result<()> {
        self.git
            .run(&["checkout", "-q", "--detach", commit])
            .with_context(|| format!("check out {commit}"))?;
        Ok(())
    }

    fn restore(&self, head: &HeadRef) -> Result<()> {
        match head {
            HeadRef::Symbolic(refname) => {
                let target = refname.strip_prefix("refs/heads/").unwrap_or(refname);
                self.git
                    .run(&["checkout", "-q", target])
                    .with_context(|| format!("check out {target}"))?;
            }
            HeadRef::Detached(commit) => self.checkout(commit)?,
        }
        Ok(())
    }

    fn toplevel(&self) -> &Path {
        &self.toplevel
    }
}

impl ConfigStore for GitRepo {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let args = ["config", "-z", "--get", key];
        let output = self.git.try_run(&args)?;
        match output.code {
            Some(0) => Ok(Some(
                output
                    .stdout
                    .strip_suffix('\0')
                    .unwrap_or(&output.stdout)
                    .to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(anyhow!("read config {key}: {}", output.stderr.trim())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.git
            .run(&["config", key, value])
            .with_context(|| format!("write config {key}"))?;
        Ok(())
    }

    fn unset_section(&self, section: &str) -> Result<bool> {
        let output = self.git.try_run(&["config", "--remove-section", section])?;
        if output.success {
            return Ok(true);
        }
        if output.stderr.contains("no such section") {
            return Ok(false);
        }
        Err(anyhow!(
            "remove config section {section}: {}",
            output.stderr.trim()
        ))
    }

    fn entries(&self, key_pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        let output = self
            .git
            .try_run(&["config", "-z", "--get-regexp", key_pattern])?;
        match output.code {
            Some(0) => Ok(parse_config_records(&output.stdout)),
            Some(1) => Ok(Vec::new()),
            _ => Err(anyhow!(
                "list config {key_pattern}: {}",
                output.stderr.trim()
            )),
        }
    }
}

/// Split `git config -z` output into `(key, value)` records. A record without
/// a newline is a key with no value.
fn parse_config_records(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split('\0')
        .filter(|record| !record.is_empty())
        .map(|record| match record.split_once('\n') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (record.to_string(), None),
        })
        .collect()
}
