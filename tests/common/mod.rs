//! Shared test infrastructure for integration tests.
//!
//! Each `TestRepo` is a throwaway git repository with a fixed identity and no
//! access to the user's global configuration.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Test command used by most scenarios.
///
/// Appends the tested tree to a log kept outside the repository, fails with
/// the code stored in `exit-code` when that file exists, and passes otherwise.
pub const LOGGING_COMMAND: &str = r#"git rev-parse HEAD^{tree} >> "$RUN_LOG"
if [ -e exit-code ]; then exit "$(cat exit-code)"; fi
exit 0"#;

/// Throwaway repository plus a scratch directory next to it.
pub struct TestRepo {
    temp: TempDir,
    root: PathBuf,
    scratch: PathBuf,
}

impl TestRepo {
    /// Create an empty repository on branch `main`, or `None` if git is not
    /// available.
    pub fn new() -> Option<Self> {
        let available = Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);
        if !available {
            eprintln!("Skipping: git not available");
            return None;
        }
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().join("repo");
        let scratch = temp.path().join("scratch");
        std::fs::create_dir_all(&root).expect("create repo dir");
        std::fs::create_dir_all(&scratch).expect("create scratch dir");
        let repo = Self {
            temp,
            root,
            scratch,
        };
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        Some(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File outside the repository that `LOGGING_COMMAND` appends to.
    pub fn run_log(&self) -> PathBuf {
        self.scratch.join("run.log")
    }

    fn isolate(&self, cmd: &mut Command) {
        cmd.current_dir(&self.root)
            .env("HOME", self.temp.path())
            .env("XDG_CONFIG_HOME", self.temp.path())
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_AUTHOR_NAME", "Test Author")
            .env("GIT_AUTHOR_EMAIL", "author@example.com")
            .env("GIT_AUTHOR_DATE", "2024-01-01T00:00:00Z")
            .env("GIT_COMMITTER_NAME", "Test Committer")
            .env("GIT_COMMITTER_EMAIL", "committer@example.com")
            .env("GIT_COMMITTER_DATE", "2024-01-01T00:00:00Z")
            .env("RUN_LOG", self.run_log())
            .env_remove("GIT_TEST_LOG")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
    }

    /// Run git and return trimmed stdout; panics on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let mut cmd = Command::new("git");
        cmd.args(args);
        self.isolate(&mut cmd);
        let output = cmd.output().expect("spawn git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn write(&self, path: &str, contents: &str) {
        std::fs::write(self.root.join(path), contents).expect("write file");
    }

    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.root.join(path)).expect("remove file");
    }

    /// Commit the whole working copy and return the new commit id.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Build a linear history `c1..cN`, each commit adding `file-N` and
    /// tagged `cN`. Returns the commit ids in order.
    pub fn linear(&self, count: usize) -> Vec<String> {
        (1..=count)
            .map(|idx| {
                self.write(&format!("file-{idx}"), &format!("{idx}\n"));
                let commit = self.commit(&format!("c{idx}"));
                self.git(&["tag", &format!("c{idx}")]);
                commit
            })
            .collect()
    }

    pub fn tree_of(&self, rev: &str) -> String {
        self.git(&["rev-parse", &format!("{rev}^{{tree}}")])
    }

    /// Stored verdict for `rev`'s tree, if any.
    pub fn verdict(&self, test: &str, rev: &str) -> Option<String> {
        let tree = self.tree_of(rev);
        let mut cmd = Command::new("git");
        cmd.args(["notes", "--ref", &format!("tests/{test}"), "show", &tree]);
        self.isolate(&mut cmd);
        let output = cmd.output().expect("spawn git");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Trees the logging command has seen, in execution order.
    pub fn executed_trees(&self) -> Vec<String> {
        std::fs::read_to_string(self.run_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn clear_run_log(&self) {
        let _ = std::fs::remove_file(self.run_log());
    }

    /// Run the built `git-test` binary.
    pub fn git_test(&self, args: &[&str]) -> TestOutput {
        self.git_test_with_stdin(args, "")
    }

    pub fn git_test_with_stdin(&self, args: &[&str], stdin: &str) -> TestOutput {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_git-test"));
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.isolate(&mut cmd);
        let mut child = cmd.spawn().expect("spawn git-test");
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes()).expect("write stdin");
        }
        TestOutput::from(child.wait_with_output().expect("wait for git-test"))
    }
}

/// Captured output of one `git-test` invocation.
#[derive(Debug)]
pub struct TestOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for TestOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl TestOutput {
    /// Second column of each `<commit> <label>` report line.
    pub fn labels(&self) -> Vec<String> {
        self.stdout
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_string)
            .collect()
    }

    #[track_caller]
    pub fn assert_code(&self, expected: i32) {
        assert_eq!(
            self.code,
            Some(expected),
            "unexpected exit code\nstdout:\n{}\nstderr:\n{}",
            self.stdout,
            self.stderr
        );
    }
}
