//! CLI command implementations

pub mod dot;
pub mod run;
pub mod show;

use std::path::Path;

use psl_core::{assemble_str, Pattern};

/// Read and assemble the pattern document at `path`
pub(crate) fn load_pattern(path: &Path) -> Result<Pattern, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(assemble_str(&text)?)
}

/// Write `text` to `output`, or stdout when none is given
pub(crate) fn emit(text: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            println!("✓ Written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
