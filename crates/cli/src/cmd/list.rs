//! Implementation of the `cairn list` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use cairn_lib::eval::EvalError;
use cairn_lib::lua::load_definitions;
use cairn_lib::store::StoreRoot;
use cairn_lib::unit::{Identify, Unit, UnitId, with_store_root};

use crate::output::{OutputFormat, print_info, print_json, symbols};

pub fn cmd_list(file: &Path, store: Option<&Path>, output: OutputFormat) -> Result<()> {
  let root = store.map(StoreRoot::new).unwrap_or_else(StoreRoot::from_env);
  let definitions =
    load_definitions(file, &root).with_context(|| format!("Failed to load definitions: {}", file.display()))?;

  let mut entries = Vec::new();
  for (name, unit) in definitions.exports() {
    let (id, path) = with_store_root(&root, || identify(&unit))
      .with_context(|| format!("Failed to identify export '{}'", name))?;
    entries.push((name, unit, id, path));
  }

  if output.is_json() {
    let items: Vec<_> = entries
      .iter()
      .map(|(name, unit, id, path)| {
        serde_json::json!({ "name": name, "kind": unit.kind(), "id": id, "path": path.display().to_string() })
      })
      .collect();
    print_json(&items)?;
    return Ok(());
  }

  if entries.is_empty() {
    print_info(&format!("{} exports no units", file.display()));
    return Ok(());
  }

  for (name, unit, id, _) in &entries {
    println!(
      "  {} {} {} {}",
      symbols::INFO,
      name,
      format!("({})", unit.kind()).if_supports_color(Stream::Stdout, |s| s.dimmed()),
      id
    );
  }

  Ok(())
}

fn identify(unit: &Unit) -> Result<(UnitId, PathBuf), EvalError> {
  Ok((unit.id()?, unit.store_path()?))
}
