//! Global Lua values and the `cairn` table.
//!
//! This module registers the `cairn` global table which provides:
//! - `cairn.fetch{}` - Define a fetched artifact
//! - `cairn.package{}` - Define a package
//! - `cairn.dedent(text)` - Strip common leading whitespace
//! - `cairn.version` - Version of the evaluator

use std::rc::Rc;

use mlua::prelude::*;

use crate::registry::Registry;
use crate::unit::lua::register_cairn_units;

/// Register the `cairn` global table in the Lua runtime.
pub fn register_globals(lua: &Lua, registry: Rc<Registry>) -> LuaResult<()> {
  let cairn = lua.create_table()?;

  cairn.set("version", env!("CARGO_PKG_VERSION"))?;

  register_cairn_units(lua, &cairn, registry)?;

  let dedent = lua.create_function(|_, text: String| Ok(textwrap::dedent(&text)))?;
  cairn.set("dedent", dedent)?;

  lua.globals().set("cairn", cairn)?;

  Ok(())
}
