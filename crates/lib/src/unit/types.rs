use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::context;
use super::fetch::Fetch;
use super::package::Package;
use super::spec::Specification;
use crate::consts::MARKER_SIGIL;
use crate::eval::EvalError;
use crate::placeholder;
use crate::util::hash::ObjectHash;

/// Human-readable, content-derived identifier of a unit.
///
/// # Format
///
/// - Package: `<name>-<version>-<hash>`, e.g. `hello-1.0-a1b2c3...`
/// - Fetch: `<name>-<hash>`, where `name` is the last segment of the URL
///
/// The identifier is also the unit's directory name in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub(crate) fn for_fetch(name: &str, hash: &ObjectHash) -> Self {
    Self(format!("{}-{}", name, hash))
  }

  pub(crate) fn for_package(name: &str, version: &str, hash: &ObjectHash) -> Self {
    Self(format!("{}-{}-{}", name, version, hash))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Whether `s` can be used as an identifier or identifier component.
  ///
  /// Rejects the empty string, `.`/`..`, path separators, whitespace and the
  /// marker sigil, so that an identifier is always a single store path entry
  /// and never breaks a marker apart.
  pub fn is_valid(s: &str) -> bool {
    !s.is_empty()
      && s != "."
      && s != ".."
      && !s
        .chars()
        .any(|c| c == '/' || c == '\\' || c == MARKER_SIGIL || c.is_whitespace() || c.is_control())
  }
}

impl fmt::Display for UnitId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl AsRef<str> for UnitId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

/// Capability shared by every kind of unit.
///
/// Identity, hash and specification are derived lazily and cached by the
/// implementor; every method may trigger resolution of the unit's text and of
/// the units it references.
pub trait Identify {
  fn id(&self) -> Result<UnitId, EvalError>;

  fn content_hash(&self) -> Result<ObjectHash, EvalError>;

  fn specification(&self) -> Result<Specification, EvalError>;
}

/// A buildable unit: either a fetched artifact or a package.
///
/// Cloning is cheap and keeps the same instance, so memoized identity is
/// shared by every holder.
#[derive(Debug, Clone)]
pub enum Unit {
  Fetch(Rc<Fetch>),
  Package(Rc<Package>),
}

impl Unit {
  /// Construct a fetch unit. See [`Fetch::new`].
  pub fn fetch(url: &str, executable: bool) -> Result<Self, EvalError> {
    Ok(Unit::Fetch(Rc::new(Fetch::new(url, executable)?)))
  }

  pub fn name(&self) -> &str {
    match self {
      Unit::Fetch(f) => f.name(),
      Unit::Package(p) => p.name(),
    }
  }

  /// Short label used in logs and cycle chains, available without hashing.
  pub fn label(&self) -> String {
    match self {
      Unit::Fetch(f) => f.name().to_string(),
      Unit::Package(p) => p.label(),
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Unit::Fetch(_) => "fetch",
      Unit::Package(_) => "package",
    }
  }

  /// Declared dependencies. Fetches have none.
  pub fn declared_dependencies(&self) -> &[Unit] {
    match self {
      Unit::Fetch(_) => &[],
      Unit::Package(p) => p.dependencies(),
    }
  }

  /// Textual self-representation: the marker embedding the identifier.
  pub fn marker(&self) -> Result<String, EvalError> {
    Ok(placeholder::marker(&self.id()?))
  }

  /// Store path under the store root currently in effect.
  pub fn store_path(&self) -> Result<PathBuf, EvalError> {
    let root = context::current_store_root();
    Ok(root.unit_path(&self.id()?))
  }

  /// Whether both handles point at the same instance.
  pub fn same_instance(&self, other: &Unit) -> bool {
    match (self, other) {
      (Unit::Fetch(a), Unit::Fetch(b)) => Rc::ptr_eq(a, b),
      (Unit::Package(a), Unit::Package(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }

  fn inner(&self) -> &dyn Identify {
    match self {
      Unit::Fetch(f) => &**f,
      Unit::Package(p) => &**p,
    }
  }
}

impl Identify for Unit {
  fn id(&self) -> Result<UnitId, EvalError> {
    self.inner().id()
  }

  fn content_hash(&self) -> Result<ObjectHash, EvalError> {
    self.inner().content_hash()
  }

  fn specification(&self) -> Result<Specification, EvalError> {
    self.inner().specification()
  }
}

impl From<Fetch> for Unit {
  fn from(fetch: Fetch) -> Self {
    Unit::Fetch(Rc::new(fetch))
  }
}

impl From<Package> for Unit {
  fn from(package: Package) -> Self {
    Unit::Package(Rc::new(package))
  }
}
