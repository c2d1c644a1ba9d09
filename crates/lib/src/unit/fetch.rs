use std::cell::OnceCell;

use tracing::debug;
use url::Url;

use super::spec::{FetchSpec, Specification};
use super::types::{Identify, UnitId};
use crate::consts::INTEGRITY_PENDING;
use crate::eval::EvalError;
use crate::util::hash::{ObjectHash, UnitHasher};

/// A leaf unit: a single artifact downloaded from a URL.
///
/// Identity depends on the URL and the executable flag only. The store root
/// plays no part, so a fetch has the same identifier everywhere.
///
/// The URL is hashed in its parsed, normalized form, not as written:
/// `HTTPS://Example.org/a` and `https://example.org/a` are the same fetch.
#[derive(Debug)]
pub struct Fetch {
  url: Url,
  executable: bool,
  name: String,
  identity: OnceCell<(ObjectHash, UnitId)>,
}

impl Fetch {
  /// Parse `url` and take the unit name from its last path segment.
  ///
  /// # Errors
  ///
  /// [`EvalError::InvalidUnitDefinition`] if the URL does not parse or ends in
  /// an empty (or otherwise unusable) path segment.
  pub fn new(url: &str, executable: bool) -> Result<Self, EvalError> {
    let url = Url::parse(url).map_err(|e| EvalError::invalid(format!("fetch url '{}': {}", url, e)))?;

    let name = url
      .path_segments()
      .and_then(|segments| segments.last())
      .filter(|segment| UnitId::is_valid(segment))
      .ok_or_else(|| EvalError::invalid(format!("fetch url '{}' has no file name", url)))?
      .to_string();

    Ok(Self {
      url,
      executable,
      name,
      identity: OnceCell::new(),
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  pub fn executable(&self) -> bool {
    self.executable
  }

  fn identity(&self) -> &(ObjectHash, UnitId) {
    self.identity.get_or_init(|| {
      let hash = UnitHasher::new()
        .field(self.url.as_str())
        .flag(self.executable)
        .finish();
      let id = UnitId::for_fetch(&self.name, &hash);
      debug!(unit = %id, url = %self.url, "identified fetch");
      (hash, id)
    })
  }
}

impl Identify for Fetch {
  fn id(&self) -> Result<UnitId, EvalError> {
    Ok(self.identity().1.clone())
  }

  fn content_hash(&self) -> Result<ObjectHash, EvalError> {
    Ok(self.identity().0.clone())
  }

  fn specification(&self) -> Result<Specification, EvalError> {
    Ok(Specification::Fetch(FetchSpec {
      identifier: self.identity().1.clone(),
      name: self.name.clone(),
      url: self.url.to_string(),
      executable: self.executable,
      integrity: INTEGRITY_PENDING.to_string(),
    }))
  }
}
