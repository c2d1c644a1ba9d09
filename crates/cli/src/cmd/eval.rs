//! Implementation of the `cairn eval` command.
//!
//! Loads a definition file, evaluates one exported unit together with
//! everything it depends on, and writes one specification per unit into the
//! eval directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use cairn_lib::emit::{SpecFormat, SpecSerializer};
use cairn_lib::eval::{EvalConfig, EvalGraph, Evaluator, evaluate};
use cairn_lib::lua::load_definitions;
use cairn_lib::store::StoreRoot;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

/// Flags of `cairn eval`.
pub struct EvalOptions {
  pub unit: String,
  pub dry_run: bool,
  pub print: bool,
  pub dot: Option<PathBuf>,
  pub store: Option<PathBuf>,
  pub eval_dir: Option<PathBuf>,
  pub format: SpecFormat,
  pub jobs: Option<usize>,
}

impl EvalOptions {
  /// Environment defaults with the command-line overrides applied.
  fn config(&self) -> EvalConfig {
    let mut config = EvalConfig::default();
    if let Some(store) = &self.store {
      config.store_root = StoreRoot::new(store);
    }
    if let Some(eval_dir) = &self.eval_dir {
      config.eval_root = eval_dir.clone();
    }
    if let Some(jobs) = self.jobs {
      config.parallelism = jobs.max(1);
    }
    config.format = self.format;
    config
  }
}

pub fn cmd_eval(file: &Path, options: &EvalOptions, output: OutputFormat) -> Result<()> {
  let config = options.config();

  let definitions = load_definitions(file, &config.store_root)
    .with_context(|| format!("Failed to load definitions: {}", file.display()))?;
  let unit = definitions
    .export(&options.unit)
    .with_context(|| format!("No unit exported as '{}' in {}", options.unit, file.display()))?;

  let (graph, written) = if options.dry_run {
    let graph = Evaluator::new(definitions.registry(), config.store_root.clone())
      .plan(&unit)
      .context("Evaluation failed")?;
    (graph, None)
  } else {
    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    let (graph, summary) = rt
      .block_on(evaluate(&unit, definitions.registry(), &config))
      .context("Evaluation failed")?;
    (graph, Some(summary.emitted.len()))
  };

  if let Some(dot) = &options.dot {
    write_dot(&graph, dot)?;
  }

  let root = graph.root().context("Evaluation produced no root unit")?;
  let spec = graph
    .specification(root)
    .with_context(|| format!("No specification recorded for {}", root))?;

  if output.is_json() {
    let json_output = serde_json::json!({
      "id": root,
      "units": graph.len(),
      "written": written,
      "eval_dir": written.map(|_| config.eval_root.display().to_string()),
      "specification": options.print.then_some(spec),
    });
    print_json(&json_output)?;
    return Ok(());
  }

  print_success(&format!("Evaluated {}", unit.label()));
  print_stat("Identifier", root.as_str());
  print_stat("Units", &graph.len().to_string());
  match written {
    Some(count) => {
      print_stat("Specifications", &count.to_string());
      print_stat("Eval directory", &config.eval_root.display().to_string());
    }
    None => print_info("Dry run - no specifications written"),
  }

  if options.print {
    let text = config
      .format
      .serialize(spec)
      .with_context(|| format!("Failed to serialize specification of {}", root))?;
    println!();
    print!("{}", text);
  }

  Ok(())
}

fn write_dot(graph: &EvalGraph, path: &Path) -> Result<()> {
  fs::write(path, graph.to_dot()).with_context(|| format!("Failed to write graph: {}", path.display()))?;
  info!(path = %path.display(), units = graph.len(), "dependency graph written");
  Ok(())
}
