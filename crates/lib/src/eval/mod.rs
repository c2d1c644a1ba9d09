//! Evaluation of a root unit and everything it depends on.
//!
//! Evaluation runs in two phases:
//!
//! 1. **Plan** ([`Evaluator::plan`]): a depth-first walk from the root. Each
//!    package's text is resolved (which may discover new dependencies through
//!    markers), every dependency is evaluated before its dependent, and each
//!    unique identifier lands in the [`EvalGraph`] exactly once. Runs on the
//!    calling thread; units are not `Send`.
//! 2. **Emit** ([`emit_graph`]): the graph is split into dependency waves and
//!    every wave's specifications are written concurrently through an
//!    [`Emit`] implementation, bounded by `parallelism`.
//!
//! # Example
//!
//! ```no_run
//! use cairn_lib::eval::{EvalConfig, Evaluator};
//! use cairn_lib::registry::Registry;
//! use cairn_lib::unit::Unit;
//!
//! # async fn run() -> Result<(), cairn_lib::eval::EvalError> {
//! let tool = Unit::fetch("https://example.com/tool", true)?;
//! let registry = Registry::from_units([tool.clone()]);
//! let config = EvalConfig::default();
//! let graph = Evaluator::new(&registry, config.store_root.clone()).plan(&tool)?;
//! assert_eq!(graph.len(), 1);
//! # Ok(())
//! # }
//! ```

mod graph;
mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace};

use crate::emit::{Emit, EmitError};
use crate::store::StoreRoot;
use crate::unit::{self, Identify, Unit, UnitId};

pub use graph::EvalGraph;
pub use types::{EmitSummary, EvalConfig, EvalError};

/// Finds a unit by identifier.
///
/// Used to resolve identifiers discovered in markers that are not among a
/// package's declared dependencies.
pub trait UnitLookup {
  fn lookup(&self, id: &UnitId) -> Result<Option<Unit>, EvalError>;
}

impl UnitLookup for HashMap<UnitId, Unit> {
  fn lookup(&self, id: &UnitId) -> Result<Option<Unit>, EvalError> {
    Ok(self.get(id).cloned())
  }
}

/// Plans the evaluation of root units against one store root.
pub struct Evaluator<'a, L: UnitLookup + ?Sized> {
  lookup: &'a L,
  store_root: StoreRoot,
}

impl<'a, L: UnitLookup + ?Sized> Evaluator<'a, L> {
  pub fn new(lookup: &'a L, store_root: StoreRoot) -> Self {
    Self { lookup, store_root }
  }

  pub fn store_root(&self) -> &StoreRoot {
    &self.store_root
  }

  /// Walk `root` and its transitive dependencies.
  ///
  /// # Errors
  ///
  /// - [`EvalError::Cycle`] if a unit depends on itself, directly or not
  /// - [`EvalError::UnresolvedReference`] if a marker names an unknown unit
  /// - any error raised while resolving a unit's text
  pub fn plan(&self, root: &Unit) -> Result<EvalGraph, EvalError> {
    unit::with_store_root(&self.store_root, || {
      let mut walk = Walk {
        lookup: self.lookup,
        graph: EvalGraph::new(),
        state: HashMap::new(),
        chain: Vec::new(),
      };
      let root_id = walk.visit(root)?;
      info!(root = %root_id, units = walk.graph.len(), store = %self.store_root, "evaluation planned");
      walk.graph.set_root(root_id);
      Ok(walk.graph)
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
  InProgress,
  Done,
}

struct Walk<'a, L: UnitLookup + ?Sized> {
  lookup: &'a L,
  graph: EvalGraph,
  state: HashMap<UnitId, VisitState>,
  chain: Vec<UnitId>,
}

impl<L: UnitLookup + ?Sized> Walk<'_, L> {
  fn visit(&mut self, unit: &Unit) -> Result<UnitId, EvalError> {
    let id = unit.id()?;

    match self.state.get(&id) {
      Some(VisitState::Done) => {
        trace!(unit = %id, "already evaluated");
        return Ok(id);
      }
      Some(VisitState::InProgress) => {
        let start = self.chain.iter().position(|c| c == &id).unwrap_or(0);
        let mut chain: Vec<String> = self.chain[start..].iter().map(UnitId::to_string).collect();
        chain.push(id.to_string());
        return Err(EvalError::Cycle { chain });
      }
      None => {}
    }

    self.state.insert(id.clone(), VisitState::InProgress);
    self.chain.push(id.clone());
    debug!(unit = %id, kind = unit.kind(), depth = self.chain.len(), "evaluating");

    for dependency in self.dependencies_of(unit, &id)?.into_values() {
      let dep_id = self.visit(&dependency)?;
      self.graph.add_dependency(&dep_id, &id);
    }

    self.graph.insert(unit.specification()?);
    self.chain.pop();
    self.state.insert(id.clone(), VisitState::Done);
    Ok(id)
  }

  /// Declared plus discovered dependencies, keyed and ordered by identifier.
  fn dependencies_of(&self, unit: &Unit, id: &UnitId) -> Result<BTreeMap<UnitId, Unit>, EvalError> {
    let Unit::Package(package) = unit else {
      return Ok(BTreeMap::new());
    };
    let resolved = package.resolve()?;

    let mut dependencies = BTreeMap::new();
    for dependency in package.dependencies() {
      dependencies.insert(dependency.id()?, dependency.clone());
    }

    for reference in &resolved.discovered {
      if dependencies.contains_key(reference) {
        continue;
      }
      let found = match self.lookup.lookup(reference)? {
        Some(found) if &found.id()? == reference => found,
        _ => {
          return Err(EvalError::UnresolvedReference {
            unit: id.to_string(),
            reference: reference.clone(),
          });
        }
      };
      trace!(unit = %id, reference = %reference, "discovered dependency");
      dependencies.insert(reference.clone(), found);
    }

    Ok(dependencies)
  }
}

/// Write every specification in `graph`, dependencies first.
///
/// Units of one wave are written concurrently, at most `parallelism` at a
/// time. The first failure stops the run after its wave settles; files
/// already written stay in place.
pub async fn emit_graph<E: Emit>(
  graph: &EvalGraph,
  emitter: Arc<E>,
  parallelism: usize,
) -> Result<EmitSummary, EvalError> {
  let waves = graph.waves()?;
  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let mut summary = EmitSummary::default();

  info!(units = graph.len(), waves = waves.len(), parallelism, "emitting specifications");

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, size = wave.len(), "emitting wave");

    let mut handles = Vec::with_capacity(wave.len());
    for id in wave {
      let Some(spec) = graph.specification(id).cloned() else {
        continue;
      };
      let task_id = id.clone();
      let emitter = emitter.clone();
      let semaphore = semaphore.clone();

      let handle = tokio::spawn(async move {
        let _permit = semaphore
          .acquire_owned()
          .await
          .map_err(|e| EmitError::Task(e.to_string()))?;
        emitter.emit(&task_id, &spec).await
      });
      handles.push((id.clone(), handle));
    }

    let mut first_error = None;
    for (id, handle) in handles {
      let result = match handle.await {
        Ok(result) => result,
        Err(e) => Err(EmitError::Task(e.to_string())),
      };
      match result {
        Ok(()) => summary.emitted.push(id),
        Err(source) => {
          error!(unit = %id, error = %source, "failed to emit specification");
          first_error.get_or_insert(EvalError::Persistence { unit: id, source });
        }
      }
    }

    summary.waves += 1;
    if let Some(err) = first_error {
      return Err(err);
    }
  }

  Ok(summary)
}

/// Plan `root` and emit its specifications with `config`.
///
/// The file-backed convenience over [`Evaluator::plan`] and [`emit_graph`].
pub async fn evaluate<L: UnitLookup + ?Sized>(
  root: &Unit,
  lookup: &L,
  config: &EvalConfig,
) -> Result<(EvalGraph, EmitSummary), EvalError> {
  let graph = Evaluator::new(lookup, config.store_root.clone()).plan(root)?;
  let writer = Arc::new(crate::emit::SpecWriter::new(config.eval_root.clone(), config.format));
  let summary = emit_graph(&graph, writer, config.parallelism).await?;
  Ok((graph, summary))
}
