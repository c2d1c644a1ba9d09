//! Store locations for cairn.
//!
//! The store is the content-addressed directory an external builder realizes
//! units into. Evaluation never writes to it; it only needs the root prefix to
//! render the store path of every referenced unit.
//!
//! # Layout
//!
//! ```text
//! store/
//! └── <identifier>/          # one entry per unit, e.g. hello-1.0-<hash>
//! eval/
//! └── <identifier>.toml      # emitted specification (see `emit`)
//! ```

pub mod paths;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::placeholder::{PlaceholderError, Resolver};
use crate::unit::UnitId;

pub use paths::StorePaths;

/// Root prefix under which unit store paths are rendered.
///
/// The store root takes part in every package hash that embeds a reference,
/// so two evaluations against different roots produce different identifiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreRoot(PathBuf);

impl StoreRoot {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  /// Store root from `CAIRN_STORE` / `CAIRN_ROOT`, falling back to `/cairn/store`.
  pub fn from_env() -> Self {
    Self(StorePaths::store_path())
  }

  pub fn path(&self) -> &Path {
    &self.0
  }

  /// Store path of a unit: `<root>/<identifier>`.
  pub fn unit_path(&self, id: &UnitId) -> PathBuf {
    self.0.join(id.as_str())
  }
}

impl fmt::Display for StoreRoot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

impl Resolver for StoreRoot {
  fn resolve_unit(&self, id: &UnitId) -> Result<String, PlaceholderError> {
    Ok(self.unit_path(id).to_string_lossy().into_owned())
  }
}
