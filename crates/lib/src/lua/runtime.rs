use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::lua::globals;
use crate::registry::Registry;

/// Create a new Lua runtime with the `cairn` global registered.
///
/// `require` additionally searches `./lua/` relative to the working directory.
pub fn create_runtime(registry: Rc<Registry>) -> LuaResult<Lua> {
  let lua = Lua::new();
  let package = lua.globals().get::<LuaTable>("package")?;
  let package_path = package.get::<String>("path")?;
  package.set("path", format!("./lua/?.lua;./lua/?/init.lua;{}", package_path))?;

  globals::register_globals(&lua, registry)?;

  Ok(lua)
}

/// Load and execute a Lua file, returning what the chunk returns.
///
/// Sets `cairn.dir` to the directory of the loaded file and makes that
/// directory searchable by `require`.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot canonicalize '{}': {}", path.display(), e)))?;
  let content = std::fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  let dir = canonical_path
    .parent()
    .unwrap_or(Path::new(""))
    .to_string_lossy()
    .into_owned();

  let cairn = lua.globals().get::<LuaTable>("cairn")?;
  cairn.set("dir", dir.as_str())?;

  let package = lua.globals().get::<LuaTable>("package")?;
  let package_path = package.get::<String>("path")?;
  package.set("path", format!("{dir}/?.lua;{dir}/?/init.lua;{package_path}"))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .eval::<LuaValue>()
}
