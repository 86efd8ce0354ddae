//! Show command
//!
//! Usage: psl show <PATTERN>

use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Pattern document (JSON)
    pub pattern: PathBuf,
}

/// Execute show command
pub fn execute(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = super::load_pattern(&args.pattern)?;
    println!("{}", pattern);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_show_loads_pattern() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"hook": "h", "match": {{"type": "Foo"}}}}"#).unwrap();

        let pattern = crate::commands::load_pattern(file.path()).unwrap();
        assert_eq!(pattern.to_string(), "Foo => #h;");

        execute(ShowArgs {
            pattern: file.path().to_path_buf(),
        })
        .unwrap();
    }

    #[test]
    fn test_show_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = execute(ShowArgs {
            pattern: dir.path().join("absent.json"),
        });
        assert!(result.is_err());
    }
}
