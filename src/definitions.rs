//! Test definitions stored in configuration.
//!
//! Each test is a name mapped to a shell command under `test.<name>.command`.
//! Defining a test also decides what happens to verdicts recorded under a
//! previous definition of the same name.
use crate::error::UsageError;
use crate::report::{self, Verbosity};
use crate::results::{NamespaceState, ResultStore};
use crate::store::{ConfigStore, TreeStore};
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::cell::OnceCell;
use std::sync::OnceLock;

/// Test used when no `--test` is given.
pub const DEFAULT_TEST_NAME: &str = "default";

const COMMAND_KEY_PATTERN: &str = r"^test\..+\.command$";

fn test_name_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("test name regex"))
}

fn command_key_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^test\.(.+)\.command$").expect("command key regex"))
}

/// Test names become ref components, so they are restricted accordingly.
pub fn validate_test_name(name: &str) -> Result<()> {
    let valid = test_name_regex().is_match(name)
        && !name.contains("..")
        && !name.ends_with(".lock");
    if valid {
        return Ok(());
    }
    Err(UsageError::new(format!(
        "invalid test name {name:?} (use letters, digits, '.', '_' and '-')"
    ))
    .into())
}

fn command_key(name: &str) -> String {
    format!("test.{name}.command")
}

/// A defined test as listed by `git test list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDefinition {
    pub name: String,
    pub command: String,
}

/// Create, read, and delete test commands.
pub struct TestRegistry<'a, C: ConfigStore + ?Sized> {
    config: &'a C,
}

impl<'a, C: ConfigStore + ?Sized> TestRegistry<'a, C> {
    pub fn new(config: &'a C) -> Self {
        Self { config }
    }

    pub fn get_command(&self, name: &str) -> Result<String> {
        self.config
            .get(&command_key(name))?
            .ok_or_else(|| anyhow!("test '{name}' is not defined (define it with `git test add`)"))
    }

    /// Store `command` verbatim, replacing any previous definition.
    pub fn set_command(&self, name: &str, command: &str) -> Result<()> {
        self.config
            .set(&command_key(name), command)
            .with_context(|| format!("define test '{name}'"))
    }

    /// Delete the definition. Returns `false` if there was none.
    pub fn remove_definition(&self, name: &str) -> Result<bool> {
        self.config.unset_section(&format!("test.{name}"))
    }

    /// All defined tests in configuration order; entries without a command
    /// or with an unusable name are skipped.
    pub fn list(&self) -> Result<Vec<TestDefinition>> {
        let entries = self.config.entries(COMMAND_KEY_PATTERN)?;
        let mut tests: Vec<TestDefinition> = Vec::new();
        for (key, value) in entries {
            let Some(command) = value else {
                tracing::debug!(key, "skipping test without a command");
                continue;
            };
            let Some(name) = command_key_regex()
                .captures(&key)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };
            if validate_test_name(&name).is_err() {
                tracing::debug!(key, "skipping malformed test entry");
                continue;
            }
            // A later value for the same key wins, but keeps the first position.
            match tests.iter_mut().find(|test| test.name == name) {
                Some(existing) => existing.command = command,
                None => tests.push(TestDefinition { name, command }),
            }
        }
        Ok(tests)
    }
}

/// A test whose command is fetched only when first needed.
pub struct Test<'a, C: ConfigStore + ?Sized> {
    name: String,
    registry: TestRegistry<'a, C>,
    command: OnceCell<String>,
}

impl<'a, C: ConfigStore + ?Sized> Test<'a, C> {
    pub fn new(config: &'a C, name: &str) -> Self {
        Self {
            name: name.to_string(),
            registry: TestRegistry::new(config),
            command: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> Result<&str> {
        if let Some(command) = self.command.get() {
            return Ok(command);
        }
        let command = self.registry.get_command(&self.name)?;
        Ok(self.command.get_or_init(|| command))
    }
}

/// What `add` does with verdicts recorded under an earlier definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultsPolicy {
    /// Keep them, warning that they now count for the new command.
    #[default]
    Warn,
    /// Keep them silently.
    Keep,
    /// Discard them.
    Forget,
}

/// How `add` left the results namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Initialized,
    Kept,
    KeptWithWarning,
    Reset,
}

/// Define or redefine a test.
pub fn add_test<S>(
    repo: &S,
    name: &str,
    command: &str,
    policy: ResultsPolicy,
    verbosity: Verbosity,
) -> Result<AddOutcome>
where
    S: TreeStore + ConfigStore + ?Sized,
{
    validate_test_name(name)?;
    TestRegistry::new(repo).set_command(name, command)?;

    let results = ResultStore::new(repo, name, verbosity);
    let message = format!("git test: initialize results for test '{name}'");
    let outcome = match (results.state()?, policy) {
        (NamespaceState::Absent, _) => {
            results.initialize(&message)?;
            AddOutcome::Initialized
        }
        (_, ResultsPolicy::Forget) => {
            results.reset(&message)?;
            AddOutcome::Reset
        }
        (NamespaceState::HasResults, ResultsPolicy::Warn) => {
            report::warn(&format!(
                "there are already results for test '{name}'; \
                 they will be considered valid for the new definition"
            ));
            AddOutcome::KeptWithWarning
        }
        (NamespaceState::Empty | NamespaceState::HasResults, _) => AddOutcome::Kept,
    };
    tracing::debug!(test = name, ?outcome, "defined test");
    Ok(outcome)
}

/// Delete a test's definition and its results together.
///
/// If the definition cannot be removed after the results were, the results
/// are put back before the error is returned.
pub fn remove_test<S>(repo: &S, name: &str, verbosity: Verbosity) -> Result<()>
where
    S: TreeStore + ConfigStore + ?Sized,
{
    validate_test_name(name)?;
    let results = ResultStore::new(repo, name, verbosity);
    let saved = results.delete()?;
    let removed = match TestRegistry::new(repo).remove_definition(name) {
        Ok(removed) => removed,
        Err(err) => {
            if let Some(value) = saved.as_deref() {
                if let Err(restore_err) = results.restore(value) {
                    tracing::warn!(test = name, error = %restore_err, "could not restore results");
                }
            }
            return Err(err.context(format!("remove definition of test '{name}'")));
        }
    };
    if !removed && saved.is_none() {
        return Err(anyhow!("test '{name}' is not defined"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "definitions_tests.rs"]
mod tests;
