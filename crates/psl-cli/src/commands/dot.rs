//! Dot command
//!
//! Usage: psl dot <PATTERN> [--output <FILE>]

use clap::Args;
use std::path::PathBuf;

use psl_core::{HookRegistry, StateRegister};

#[derive(Debug, Args)]
pub struct DotArgs {
    /// Pattern document (JSON)
    pub pattern: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute dot command
pub fn execute(args: DotArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dot = render(&args)?;
    super::emit(&dot, args.output.as_deref())
}

fn render(args: &DotArgs) -> Result<String, Box<dyn std::error::Error>> {
    let pattern = super::load_pattern(&args.pattern)?;

    // hooks are only named here, never invoked
    let mut hooks: HookRegistry<()> = HookRegistry::new();
    for name in pattern.hook_names() {
        hooks.register(name, |_, _| {});
    }
    let register = StateRegister::compile(&pattern, &hooks)?;
    Ok(register.to_dot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_writes_digraph() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"hook": "h", "match": {{"type": "Foo"}}}}"#
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.dot");
        execute(DotArgs {
            pattern: file.path().to_path_buf(),
            output: Some(output.clone()),
        })
        .unwrap();

        let dot = std::fs::read_to_string(output).unwrap();
        assert!(dot.starts_with("digraph"));
    }

    #[test]
    fn test_render_rejects_bad_pattern() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hook": "h", "match": 1}}"#).unwrap();

        let args = DotArgs {
            pattern: file.path().to_path_buf(),
            output: None,
        };
        assert!(render(&args).is_err());
    }
}
