use super::{open_repo, stdin_revisions};
use crate::cli::ResultsArgs;
use crate::definitions::validate_test_name;
use crate::report::Verbosity;
use crate::results::{ResultStore, Verdict};
use crate::revisions::{self, RevisionRequest, Selection};
use crate::store::TreeStore;
use anyhow::Result;
use serde::Serialize;

/// Stored verdict of one revision, as printed by `git test results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultEntry {
    pub commit: String,
    pub tree: String,
    pub verdict: Verdict,
}

pub fn run_results(args: &ResultsArgs, verbosity: Verbosity) -> Result<i32> {
    validate_test_name(&args.test.name)?;
    let request = RevisionRequest::parse(&args.revisions, args.stdin)?;
    let repo = open_repo()?;
    let stdin = stdin_revisions(&request)?;
    let selection = revisions::expand(&repo, &request, &stdin)?;
    let entries = collect_results(&repo, &args.test.name, verbosity, selection)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{} {}", entry.commit, entry.verdict);
        }
    }
    Ok(0)
}

/// Look up the stored verdict of every selected revision. The working copy
/// stands for `HEAD`.
fn collect_results<S: TreeStore + ?Sized>(
    store: &S,
    test_name: &str,
    verbosity: Verbosity,
    selection: Selection,
) -> Result<Vec<ResultEntry>> {
    let selected = match selection {
        Selection::WorkingCopy => vec![revisions::resolve(store, "HEAD")?],
        Selection::Revisions(selected) => selected,
    };
    let results = ResultStore::new(store, test_name, verbosity);
    selected
        .into_iter()
        .map(|revision| {
            let verdict = results.read(&revision.tree)?;
            Ok(ResultEntry {
                commit: revision.commit,
                tree: revision.tree,
                verdict,
            })
        })
        .collect()
}
