//! Persisting specifications.
//!
//! Each evaluated unit produces one [`Specification`], written to
//! `<eval-dir>/<identifier>.<ext>`. The identifier is content-derived, so a
//! file that already exists with the same bytes is left alone and the write is
//! idempotent. New files are written to a temp file and renamed into place.
//!
//! The evaluator drives an [`Emit`] implementation; [`SpecWriter`] is the
//! file-backed one.

mod format;
mod writer;

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::unit::{Specification, UnitId};

pub use format::{SpecFormat, SpecSerializer};
pub use writer::{SpecWriter, WriteOutcome};

/// Errors that can occur while persisting or reading back specifications.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
  #[error("failed to create directory '{}': {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  #[error("failed to write '{}': {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  #[error("failed to read '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  #[error("failed to serialize specification: {0}")]
  Serialize(String),

  #[error("failed to parse specification: {0}")]
  Parse(String),

  #[error("specification file for {expected} describes {found}")]
  Mismatch { expected: UnitId, found: UnitId },

  #[error("emit task failed: {0}")]
  Task(String),
}

/// Destination for evaluated specifications.
///
/// Implementations must tolerate concurrent calls for distinct identifiers.
pub trait Emit: Send + Sync + 'static {
  fn emit(&self, id: &UnitId, spec: &Specification) -> impl Future<Output = Result<(), EmitError>> + Send;
}
