use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::eval::EvalError;
use crate::lua::runtime;
use crate::registry::Registry;
use crate::store::StoreRoot;
use crate::unit::lua::{eval_error_in, unit_from_lua};
use crate::unit::{Unit, with_store_root};

/// Errors that can occur while loading a definition file.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("lua error: {0}")]
  Lua(#[source] LuaError),

  #[error(transparent)]
  Eval(#[from] EvalError),

  #[error("definition file must return a table of units, got {0}")]
  NotATable(&'static str),

  #[error("export '{0}' is not a unit")]
  InvalidExport(String),
}

impl From<LuaError> for LoadError {
  fn from(err: LuaError) -> Self {
    match eval_error_in(&err) {
      Some(eval) => LoadError::Eval(eval),
      None => LoadError::Lua(err),
    }
  }
}

/// Units defined by a Lua file.
///
/// Keeps the Lua state alive: package templates written in Lua call back
/// into it whenever an identity is computed.
pub struct Definitions {
  registry: Rc<Registry>,
  store_root: StoreRoot,
  _lua: Lua,
}

impl Definitions {
  /// Store root the file was loaded under.
  ///
  /// Markers a definition renders while loading embed identifiers computed
  /// under this root, so evaluation has to use the same one.
  pub fn store_root(&self) -> &StoreRoot {
    &self.store_root
  }

  /// The registry of every unit the file constructed.
  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  /// A unit exported under `name`.
  pub fn export(&self, name: &str) -> Option<Unit> {
    self.registry.exported(name)
  }

  /// Export names with their units, sorted by name.
  pub fn exports(&self) -> Vec<(String, Unit)> {
    self.registry.exports()
  }
}

/// Load a definition file.
///
/// The file must return a table mapping export names to units:
///
/// ```lua
/// local toybox = cairn.fetch { url = "http://landley.net/toybox/bin/toybox-x86_64", executable = true }
/// return { toybox = toybox }
/// ```
///
/// Non-string keys and values that are not units are rejected.
///
/// The chunk runs with `store_root` installed: a package concatenated into a
/// string while the file loads (`env = { PATH = pkg .. "/bin" }`) gets its
/// identifier computed right then.
pub fn load_definitions(path: &Path, store_root: &StoreRoot) -> Result<Definitions, LoadError> {
  with_store_root(store_root, || load_under_root(path, store_root))
}

fn load_under_root(path: &Path, store_root: &StoreRoot) -> Result<Definitions, LoadError> {
  info!(path = %path.display(), store = %store_root, "loading definitions");
  let registry = Rc::new(Registry::new());
  let lua = runtime::create_runtime(registry.clone())?;

  let value = runtime::load_file(&lua, path)?;
  let exports = match value {
    LuaValue::Table(exports) => exports,
    other => return Err(LoadError::NotATable(other.type_name())),
  };

  for pair in exports.pairs::<String, LuaValue>() {
    let (name, value) = pair?;
    let unit = unit_from_lua(&value).map_err(|_| LoadError::InvalidExport(name.clone()))?;
    debug!(export = %name, unit = %unit.label(), "exported unit");
    registry.export(name, unit);
  }

  info!(units = registry.len(), exports = registry.exports().len(), "definitions loaded");
  Ok(Definitions {
    registry,
    store_root: store_root.clone(),
    _lua: lua,
  })
}
