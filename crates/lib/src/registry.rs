//! Every unit a definition file constructed, plus its named exports.
//!
//! The registry is the identifier lookup used during evaluation. Identifiers
//! are only computed when a lookup needs them, and a unit whose identity
//! cannot be computed is skipped, since no marker can name it.
//!
//! Package identifiers depend on the store root, so the registry keeps one
//! index per root.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::eval::{EvalError, UnitLookup};
use crate::store::StoreRoot;
use crate::unit::{Identify, Unit, UnitId, current_store_root};

#[derive(Debug, Default)]
pub struct Registry {
  units: RefCell<Vec<Unit>>,
  exports: RefCell<BTreeMap<String, Unit>>,
  indexes: RefCell<HashMap<StoreRoot, Index>>,
}

/// Identifiers computed under one store root.
#[derive(Debug, Default)]
struct Index {
  by_id: HashMap<UnitId, Unit>,
  /// Number of entries of `units` already in `by_id`.
  indexed: usize,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_units(units: impl IntoIterator<Item = Unit>) -> Self {
    let registry = Self::new();
    for unit in units {
      registry.register(unit);
    }
    registry
  }

  /// Record a constructed unit. Registering the same instance twice is a no-op.
  pub fn register(&self, unit: Unit) {
    let mut units = self.units.borrow_mut();
    if units.iter().any(|known| known.same_instance(&unit)) {
      return;
    }
    trace!(unit = %unit.label(), kind = unit.kind(), "registered unit");
    units.push(unit);
  }

  /// Record `unit` under an export name, replacing any previous export.
  pub fn export(&self, name: impl Into<String>, unit: Unit) {
    self.register(unit.clone());
    self.exports.borrow_mut().insert(name.into(), unit);
  }

  pub fn exported(&self, name: &str) -> Option<Unit> {
    self.exports.borrow().get(name).cloned()
  }

  /// Export names with their units, sorted by name.
  pub fn exports(&self) -> Vec<(String, Unit)> {
    self
      .exports
      .borrow()
      .iter()
      .map(|(name, unit)| (name.clone(), unit.clone()))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.units.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.borrow().is_empty()
  }

  fn next_unindexed(&self, root: &StoreRoot) -> Option<Unit> {
    let units = self.units.borrow();
    let mut indexes = self.indexes.borrow_mut();
    let index = indexes.entry(root.clone()).or_default();
    let unit = units.get(index.indexed).cloned();
    if unit.is_some() {
      index.indexed += 1;
    }
    unit
  }
}

impl UnitLookup for Registry {
  fn lookup(&self, id: &UnitId) -> Result<Option<Unit>, EvalError> {
    let root = current_store_root();
    if let Some(unit) = self.indexes.borrow().get(&root).and_then(|index| index.by_id.get(id)) {
      return Ok(Some(unit.clone()));
    }

    // No borrow is held while computing identities: script templates may
    // construct and register more units.
    while let Some(unit) = self.next_unindexed(&root) {
      let unit_id = match unit.id() {
        Ok(unit_id) => unit_id,
        Err(e) => {
          debug!(unit = %unit.label(), error = %e, "skipping unit without identity");
          continue;
        }
      };
      let found = &unit_id == id;
      self
        .indexes
        .borrow_mut()
        .entry(root.clone())
        .or_default()
        .by_id
        .entry(unit_id)
        .or_insert_with(|| unit.clone());
      if found {
        return Ok(Some(unit));
      }
    }

    Ok(None)
  }
}
