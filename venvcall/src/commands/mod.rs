//! Command handlers.
//!
//!   run    - provision, call, print the result
//!   render - print the synthesized program only

pub mod render;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;
use venvcall_sandbox::CallableSpec;

/// Load a callable from a source file, by name or as the first `def`.
pub(crate) fn load_callable(source_file: &str, function: Option<&str>) -> Result<CallableSpec> {
    let source = std::fs::read_to_string(Path::new(source_file))
        .with_context(|| format!("Failed to read {}", source_file))?;
    let spec = match function {
        Some(name) => CallableSpec::new(name, source)?,
        None => CallableSpec::from_source(source)?,
    };
    Ok(spec)
}
