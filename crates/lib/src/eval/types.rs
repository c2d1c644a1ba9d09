use std::path::PathBuf;

use thiserror::Error;

use crate::emit::{EmitError, SpecFormat};
use crate::placeholder::PlaceholderError;
use crate::store::{StorePaths, StoreRoot};
use crate::unit::UnitId;

/// Errors that can occur while identifying, evaluating or emitting units.
///
/// Cloneable so that an error raised inside a Lua script template can be
/// carried through the Lua runtime and recovered unchanged.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
  /// A script or environment value contains a broken marker.
  #[error("malformed reference in {unit}: {source}")]
  MalformedReference {
    unit: String,
    #[source]
    source: PlaceholderError,
  },

  /// A marker names an identifier no known unit has.
  #[error("unresolved reference in {unit}: no known unit has identifier '{reference}'")]
  UnresolvedReference { unit: String, reference: UnitId },

  /// The dependency graph loops back on itself.
  ///
  /// A cycle found while resolving script templates carries `name-version`
  /// labels in its chain, not identifiers: a unit caught in one never gets a
  /// hash.
  #[error("dependency cycle: {}", chain.join(" -> "))]
  Cycle { chain: Vec<String> },

  #[error("invalid unit definition: {reason}")]
  InvalidUnitDefinition { reason: String },

  /// A script template failed for a reason of its own.
  #[error("script template of {unit} failed: {message}")]
  Template { unit: String, message: String },

  #[error("failed to persist specification of {unit}: {source}")]
  Persistence {
    unit: UnitId,
    #[source]
    source: EmitError,
  },
}

impl EvalError {
  pub fn invalid(reason: impl Into<String>) -> Self {
    EvalError::InvalidUnitDefinition { reason: reason.into() }
  }
}

/// Configuration for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvalConfig {
  /// Prefix every store path is rendered under.
  pub store_root: StoreRoot,

  /// Directory specifications are written to.
  pub eval_root: PathBuf,

  pub format: SpecFormat,

  /// Maximum number of specifications written concurrently.
  pub parallelism: usize,
}

impl Default for EvalConfig {
  fn default() -> Self {
    let paths = StorePaths::current();
    Self {
      store_root: StoreRoot::new(paths.store),
      eval_root: paths.eval,
      format: SpecFormat::default(),
      parallelism: num_cpus(),
    }
  }
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// What an emission run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
  /// Identifiers emitted, in completion order.
  pub emitted: Vec<UnitId>,
  pub waves: usize,
}
