//! Hashing utilities for content-addressed unit identities.
//!
//! This module provides:
//! - `ObjectHash`: a truncated 40-character hash used in unit identifiers
//! - `UnitHasher`: an incremental digest that canonicalizes set-like inputs
//! - `digest()`: one-shot hashing of an ordered sequence of parts
//!
//! Every part fed to the hasher is length-prefixed, so `["ab", "c"]` and
//! `["a", "bc"]` never collide. Set-like inputs (dependency identifiers,
//! environment entries) can only be added through [`UnitHasher::set`] and
//! [`UnitHasher::entries`], which sort them first. Hashing a collection in
//! its iteration order is therefore not expressible through this API.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::OBJ_HASH_PREFIX_LEN;

/// A content-addressed hash identifying a unit.
///
/// # Format
///
/// Lowercase hexadecimal, 40 characters, e.g. `"a1b2c3d4e5f6789012ab..."`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Incremental digest over ordered parts and canonicalized sets.
///
/// # Example
///
/// ```
/// use cairn_lib::util::hash::UnitHasher;
///
/// let a = UnitHasher::new().field("hello").set(["b", "a"]).finish();
/// let b = UnitHasher::new().field("hello").set(["a", "b"]).finish();
/// assert_eq!(a, b);
/// ```
#[derive(Default)]
pub struct UnitHasher {
  inner: Sha256,
}

impl UnitHasher {
  pub fn new() -> Self {
    Self { inner: Sha256::new() }
  }

  /// Append one ordered part.
  pub fn field(mut self, part: impl AsRef<[u8]>) -> Self {
    self.update_part(part.as_ref());
    self
  }

  /// Append a boolean as a single byte part.
  pub fn flag(self, value: bool) -> Self {
    self.field([u8::from(value)])
  }

  /// Append a set of parts in sorted order. Duplicates collapse.
  pub fn set<I, S>(mut self, items: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
  {
    let sorted: BTreeSet<Vec<u8>> = items.into_iter().map(|s| s.as_ref().to_vec()).collect();
    self.update_len(sorted.len());
    for item in &sorted {
      self.update_part(item);
    }
    self
  }

  /// Append key/value entries as sorted `key=value` parts.
  pub fn entries<I, K, V>(self, entries: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let joined: Vec<String> = entries
      .into_iter()
      .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
      .collect();
    self.set(joined)
  }

  pub fn finish(self) -> ObjectHash {
    let full = format!("{:x}", self.inner.finalize());
    ObjectHash(full[..OBJ_HASH_PREFIX_LEN].to_string())
  }

  fn update_len(&mut self, len: usize) {
    self.inner.update((len as u64).to_le_bytes());
  }

  fn update_part(&mut self, part: &[u8]) {
    self.update_len(part.len());
    self.inner.update(part);
  }
}

/// Hash an ordered sequence of parts.
pub fn digest<I, P>(parts: I) -> ObjectHash
where
  I: IntoIterator<Item = P>,
  P: AsRef<[u8]>,
{
  parts.into_iter().fold(UnitHasher::new(), |h, part| h.field(part)).finish()
}
