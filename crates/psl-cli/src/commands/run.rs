//! Run command
//!
//! Usage: psl run <PATTERN> <SUBJECT> [--events]

use clap::Args;
use std::path::PathBuf;

use psl_core::{walk, HookCall, HookRegistry, LivingContext, Pattern, StateRegister, Tree};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Pattern document (JSON)
    pub pattern: PathBuf,

    /// Subject tree (JSON)
    pub subject: PathBuf,

    /// Also print the named events raised by the walk
    #[arg(long)]
    pub events: bool,
}

/// Execute run command
pub fn execute(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = super::load_pattern(&args.pattern)?;
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&args.subject)?)?;
    let tree = Tree::from_json(&document)?;

    let report = run(&pattern, &tree)?;
    for line in &report.invocations {
        println!("{}", line);
    }
    if args.events {
        println!("events: {}", report.events.join(", "));
    }
    Ok(())
}

/// What a walk reported
#[derive(Debug, Default)]
struct Report {
    invocations: Vec<String>,
    events: Vec<String>,
}

fn describe(call: &HookCall<'_>) -> String {
    let mut line = format!("#{} at {}", call.hook, call.node);
    for (name, binding) in call.bindings {
        let value = serde_json::to_string(binding).unwrap_or_else(|_| "?".to_string());
        line.push_str(&format!(" {}={}", name, value));
    }
    line
}

fn run(pattern: &Pattern, tree: &Tree) -> Result<Report, Box<dyn std::error::Error>> {
    let mut hooks: HookRegistry<Vec<String>> = HookRegistry::new();
    for name in pattern.hook_names() {
        hooks.register(name, |call, lines: &mut Vec<String>| lines.push(describe(call)));
    }
    let register = StateRegister::compile(pattern, &hooks)?;
    let mut living = LivingContext::with_registers([&register], &hooks, Vec::new())?;

    let summary = walk(tree, &mut living)?;
    tracing::debug!(visited = summary.visited, living = summary.living, "walk finished");

    let events = living.named_events().iter().map(str::to_string).collect();
    Ok(Report {
        invocations: living.into_user_data(),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn pattern_file(document: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", document).unwrap();
        file
    }

    #[test]
    fn test_run_reports_each_invocation() {
        let pattern = psl_core::assemble(&json!({
            "hook": "on_foo",
            "match": {"type": "Foo", "attrs": [{"attr": "x", "match": {"value": 1}}]}
        }))
        .unwrap();
        let tree = Tree::from_json(&json!([
            {"$type": "Foo", "x": 1},
            {"$type": "Foo", "x": 2},
            {"$type": "Foo", "x": 1}
        ]))
        .unwrap();

        let report = run(&pattern, &tree).unwrap();
        assert_eq!(report.invocations.len(), 2);
        assert!(report.invocations[0].starts_with("#on_foo at n"));
    }

    #[test]
    fn test_run_collects_named_events() {
        let pattern = psl_core::assemble(&json!({"event": "seen", "match": {"type": "A"}})).unwrap();
        let tree = Tree::from_json(&json!({"$type": "A"})).unwrap();

        let report = run(&pattern, &tree).unwrap();
        assert!(report.invocations.is_empty());
        assert_eq!(report.events, vec!["seen".to_string()]);
    }

    #[test]
    fn test_execute_from_files() {
        let pattern = pattern_file(json!({"hook": "h", "match": {"type": "A"}}));
        let subject = pattern_file(json!({"$type": "A"}));

        execute(RunArgs {
            pattern: pattern.path().to_path_buf(),
            subject: subject.path().to_path_buf(),
            events: true,
        })
        .unwrap();
    }

    #[test]
    fn test_execute_rejects_malformed_subject() {
        let pattern = pattern_file(json!({"hook": "h", "match": {"type": "A"}}));
        let subject = pattern_file(json!(null));

        let result = execute(RunArgs {
            pattern: pattern.path().to_path_buf(),
            subject: subject.path().to_path_buf(),
            events: false,
        });
        assert!(result.is_err());
    }
}
