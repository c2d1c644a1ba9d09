//! Implementation of the `cairn show` command.
//!
//! Reads a specification written by an earlier `cairn eval` back from the
//! eval directory.

use std::path::Path;

use anyhow::{Context, Result, bail};

use cairn_lib::emit::{SpecFormat, SpecSerializer, SpecWriter};
use cairn_lib::store::StorePaths;
use cairn_lib::unit::{Specification, UnitId};

use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_show(id: &str, eval_dir: Option<&Path>, format: SpecFormat, output: OutputFormat) -> Result<()> {
  if !UnitId::is_valid(id) {
    bail!("Invalid identifier: '{}'", id);
  }
  let id = UnitId::new(id);
  let eval_dir = eval_dir.map(Path::to_path_buf).unwrap_or_else(StorePaths::eval_path);
  let writer = SpecWriter::new(eval_dir, format);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let spec = rt
    .block_on(writer.load(&id))
    .with_context(|| format!("Failed to read specification: {}", writer.path_for(&id).display()))?;
  let Some(spec) = spec else {
    bail!("No specification for {} in {}", id, writer.eval_dir().display());
  };

  if output.is_json() {
    return print_json(&spec);
  }

  print_stat("Kind", spec.kind());
  print_stat("Dependencies", &spec.dependencies().len().to_string());
  print_stat("Path", &writer.path_for(&id).display().to_string());
  println!();
  print!("{}", render(&spec, format)?);
  Ok(())
}

fn render(spec: &Specification, format: SpecFormat) -> Result<String> {
  format.serialize(spec).context("Failed to serialize specification")
}
