//! Lua bindings for `cairn.fetch{}` and `cairn.package{}`.
//!
//! This module provides:
//! - `LuaUnit` as LuaUserData: renders as its marker via `tostring` and `..`
//! - `register_cairn_units()` to add the constructors to the `cairn` table
//! - Conversion of errors across the Lua boundary in both directions

use std::rc::Rc;

use mlua::prelude::*;

use super::{Identify, Package, ScriptTemplate, Unit};
use crate::eval::EvalError;
use crate::registry::Registry;

/// A unit handed to Lua.
#[derive(Debug, Clone)]
pub struct LuaUnit(pub Unit);

impl LuaUserData for LuaUnit {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    fields.add_field_method_get("id", |_, this| this.0.id().map(|id| id.0).map_err(to_lua_error));
    fields.add_field_method_get("hash", |_, this| {
      this.0.content_hash().map(|hash| hash.0).map_err(to_lua_error)
    });
    fields.add_field_method_get("path", |_, this| {
      this
        .0
        .store_path()
        .map(|path| path.to_string_lossy().into_owned())
        .map_err(to_lua_error)
    });
    fields.add_field_method_get("name", |_, this| Ok(this.0.name().to_string()));
    fields.add_field_method_get("kind", |_, this| Ok(this.0.kind()));
    fields.add_field_method_get("version", |_, this| {
      Ok(match &this.0 {
        Unit::Package(p) => Some(p.version().to_string()),
        Unit::Fetch(_) => None,
      })
    });
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| this.0.marker().map_err(to_lua_error));

    // Either operand may be the unit: `unit .. "/bin"` and `"cp " .. unit`.
    methods.add_meta_function(LuaMetaMethod::Concat, |_, (lhs, rhs): (LuaValue, LuaValue)| {
      Ok(format!("{}{}", text_of(&lhs)?, text_of(&rhs)?))
    });

    methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaAnyUserData| {
      Ok(other.borrow::<LuaUnit>().is_ok_and(|other| this.0.same_instance(&other.0)))
    });
  }
}

/// Text of a value appearing in a concatenation or as a script.
fn text_of(value: &LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::String(s) => Ok(s.to_str()?.to_string()),
    LuaValue::Integer(i) => Ok(i.to_string()),
    LuaValue::Number(n) => Ok(n.to_string()),
    LuaValue::UserData(ud) => {
      let unit = ud.borrow::<LuaUnit>()?;
      unit.0.marker().map_err(to_lua_error)
    }
    other => Err(LuaError::external(format!("cannot use a {} as text", other.type_name()))),
  }
}

/// Extract the unit from a Lua value.
pub fn unit_from_lua(value: &LuaValue) -> LuaResult<Unit> {
  match value {
    LuaValue::UserData(ud) => Ok(ud.borrow::<LuaUnit>()?.0.clone()),
    other => Err(LuaError::external(format!(
      "expected a unit from cairn.fetch or cairn.package, got {}",
      other.type_name()
    ))),
  }
}

pub fn to_lua_error(err: EvalError) -> LuaError {
  LuaError::external(err)
}

/// Find an [`EvalError`] carried by a Lua error, looking through callback
/// and context wrappers.
pub fn eval_error_in(err: &LuaError) -> Option<EvalError> {
  match err {
    LuaError::ExternalError(inner) => inner.downcast_ref::<EvalError>().cloned(),
    LuaError::CallbackError { cause, .. } => eval_error_in(cause),
    LuaError::WithContext { cause, .. } => eval_error_in(cause),
    _ => None,
  }
}

/// Convert a Lua error raised on behalf of `unit` back into an [`EvalError`].
///
/// Errors that did not originate in evaluation become [`EvalError::Template`].
pub fn from_lua_error(unit: &str, err: LuaError) -> EvalError {
  eval_error_in(&err).unwrap_or_else(|| EvalError::Template {
    unit: unit.to_string(),
    message: err.to_string(),
  })
}

/// Register `cairn.fetch` and `cairn.package` on the cairn table.
///
/// Every unit constructed is recorded in `registry`.
pub fn register_cairn_units(lua: &Lua, cairn: &LuaTable, registry: Rc<Registry>) -> LuaResult<()> {
  let fetch_registry = registry.clone();
  let fetch_fn = lua.create_function(move |_, spec: LuaTable| {
    let url: String = spec
      .get("url")
      .map_err(|_| LuaError::external("fetch spec requires a 'url' string"))?;
    let executable: Option<bool> = spec.get("executable")?;

    let unit = Unit::fetch(&url, executable.unwrap_or(false)).map_err(to_lua_error)?;
    fetch_registry.register(unit.clone());
    Ok(LuaUnit(unit))
  })?;
  cairn.set("fetch", fetch_fn)?;

  let package_fn = lua.create_function(move |_, spec: LuaTable| {
    let name: String = spec
      .get("name")
      .map_err(|_| LuaError::external("package spec requires a 'name' string"))?;
    let version: String = spec
      .get("version")
      .map_err(|_| LuaError::external("package spec requires a 'version' string"))?;
    let label = format!("{}-{}", name, version);

    let mut builder = Package::builder(name, version);

    match spec.get::<LuaValue>("script")? {
      LuaValue::Nil => {}
      LuaValue::Function(func) => builder = builder.with_template(lua_template(label.clone(), func)),
      other => builder = builder.with_script_text(text_of(&other)?),
    }

    if let Some(deps) = spec.get::<Option<LuaTable>>("deps")? {
      for dep in deps.sequence_values::<LuaValue>() {
        builder = builder.with_dependency(unit_from_lua(&dep?)?);
      }
    }

    if let Some(env) = spec.get::<Option<LuaTable>>("env")? {
      for pair in env.pairs::<String, LuaValue>() {
        let (key, value) = pair?;
        builder = builder.with_env(key, text_of(&value)?);
      }
    }

    let unit = builder.build().map_err(to_lua_error)?;
    registry.register(unit.clone());
    Ok(LuaUnit(unit))
  })?;
  cairn.set("package", package_fn)?;

  Ok(())
}

/// Wrap a Lua function as a script template.
fn lua_template(label: String, func: LuaFunction) -> ScriptTemplate {
  ScriptTemplate::new(move || {
    let value: LuaValue = func.call(()).map_err(|e| from_lua_error(&label, e))?;
    text_of(&value).map_err(|e| from_lua_error(&label, e))
  })
}
