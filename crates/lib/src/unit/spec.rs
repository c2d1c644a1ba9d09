use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::UnitId;

/// Emitted description of a fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSpec {
  pub identifier: UnitId,
  pub name: String,
  pub url: String,
  pub executable: bool,
  /// Digest of the fetched bytes. Always `"pending"` for now; see
  /// [`INTEGRITY_PENDING`](crate::consts::INTEGRITY_PENDING).
  pub integrity: String,
}

/// Emitted description of a package with its text fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
  pub identifier: UnitId,
  pub name: String,
  pub version: String,
  pub script: String,
  /// Effective dependency identifiers, sorted.
  #[serde(default)]
  pub dependencies: Vec<UnitId>,
  #[serde(default)]
  pub environment: BTreeMap<String, String>,
}

/// Specification of one unit, ready for serialization.
///
/// Field order follows the struct declarations, with the environment last so
/// it lands as a trailing TOML table. The kind is recovered from
/// the field shape when reading back: only packages carry a `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Specification {
  Package(PackageSpec),
  Fetch(FetchSpec),
}

impl Specification {
  pub fn identifier(&self) -> &UnitId {
    match self {
      Specification::Package(p) => &p.identifier,
      Specification::Fetch(f) => &f.identifier,
    }
  }

  pub fn name(&self) -> &str {
    match self {
      Specification::Package(p) => &p.name,
      Specification::Fetch(f) => &f.name,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Specification::Package(_) => "package",
      Specification::Fetch(_) => "fetch",
    }
  }

  pub fn dependencies(&self) -> &[UnitId] {
    match self {
      Specification::Package(p) => &p.dependencies,
      Specification::Fetch(_) => &[],
    }
  }
}
