use super::open_repo;
use crate::cli::ListArgs;
use crate::definitions::{TestDefinition, TestRegistry};
use anyhow::Result;

pub fn run_list(args: &ListArgs) -> Result<i32> {
    let repo = open_repo()?;
    let tests = TestRegistry::new(&repo).list()?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tests)?);
    } else {
        for test in &tests {
            println!("{}", list_line(test));
        }
    }
    Ok(0)
}

/// `name: command`, with a multi-line command indented under its name.
fn list_line(test: &TestDefinition) -> String {
    let command = test.command.trim_end().replace('\n', "\n    ");
    format!("{}: {command}", test.name)
}
