//! Global Lua values and the `nin` table.
//!
//! This module registers the `nin` global table which provides:
//! - `nin.os` - platform name the generator runs on ("linux", "mac", "win")
//! - `nin.args` - key/value defines passed on the command line
//! - `nin.dir` - directory of the configuration file
//! - `nin.rule{}` / `nin.build{}` / `nin.variable()` / `nin.default()` -
//!   declare graph objects
//! - `nin.select{}` - query the declared objects
//! - `nin.glob()` / `nin.prefix()` / `nin.exclude()` / `nin.path` - list and
//!   path utilities

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::context::Context;
use crate::object::{Object, ObjectKind, Value};

use super::helpers::register_helpers;
use super::object::{ObjectHandle, lua_to_value};
use super::select::{SelectionHandle, parse_select_table};

/// Register the `nin` global table in the Lua runtime.
pub fn register_globals(
  lua: &Lua,
  ctx: Rc<RefCell<Context>>,
  defines: &BTreeMap<String, String>,
  dir: &Path,
) -> LuaResult<()> {
  let nin = lua.create_table()?;

  nin.set("os", os_name())?;
  nin.set("version", env!("CARGO_PKG_VERSION"))?;
  nin.set("dir", dir.to_string_lossy().to_string())?;

  let args = lua.create_table()?;
  for (key, value) in defines {
    args.set(key.as_str(), value.as_str())?;
  }
  nin.set("args", args)?;

  register_rule(lua, &nin, ctx.clone())?;
  register_build(lua, &nin, ctx.clone())?;
  register_variable(lua, &nin, ctx.clone())?;
  register_default(lua, &nin, ctx.clone())?;
  register_select(lua, &nin, ctx)?;
  register_helpers(lua, &nin)?;

  lua.globals().set("nin", nin)?;
  Ok(())
}

/// The platform name scripts branch on, in build-file vocabulary.
fn os_name() -> &'static str {
  match std::env::consts::OS {
    "macos" => "mac",
    "windows" => "win",
    other => other,
  }
}

/// Copy every named field of a spec table into the object's attribute bag,
/// unresolved. Placeholders in these values survive until expansion.
fn fill_args(object: &mut Object, spec: &LuaTable) -> LuaResult<()> {
  for pair in spec.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let LuaValue::String(key) = key else {
      return Err(LuaError::external("spec fields must be named"));
    };
    let key = key.to_str()?.to_string();
    match lua_to_value(value)? {
      Value::Absent => {}
      value => {
        object.args.insert(key, value);
      }
    }
  }
  Ok(())
}

fn register_rule(lua: &Lua, nin: &LuaTable, ctx: Rc<RefCell<Context>>) -> LuaResult<()> {
  let rule_fn = lua.create_function(move |_, spec: LuaTable| {
    spec
      .get::<String>("name")
      .map_err(|_| LuaError::external("rule{} requires a 'name' string"))?;
    spec
      .get::<String>("command")
      .map_err(|_| LuaError::external("rule{} requires a 'command' string"))?;

    let mut object = Object::new(ObjectKind::Rule);
    fill_args(&mut object, &spec)?;
    let id = ctx.borrow_mut().insert(object);
    Ok(ObjectHandle { ctx: ctx.clone(), id })
  })?;
  nin.set("rule", rule_fn)?;
  Ok(())
}

fn register_build(lua: &Lua, nin: &LuaTable, ctx: Rc<RefCell<Context>>) -> LuaResult<()> {
  let build_fn = lua.create_function(move |_, spec: LuaTable| {
    let outputs: LuaValue = spec.get("outputs")?;
    if outputs.is_nil() {
      return Err(LuaError::external("build{} requires an 'outputs' field"));
    }
    spec
      .get::<String>("rule")
      .map_err(|_| LuaError::external("build{} requires a 'rule' string"))?;

    let mut object = Object::new(ObjectKind::Build);
    fill_args(&mut object, &spec)?;
    let id = ctx.borrow_mut().insert(object);
    Ok(ObjectHandle { ctx: ctx.clone(), id })
  })?;
  nin.set("build", build_fn)?;
  Ok(())
}

fn register_variable(lua: &Lua, nin: &LuaTable, ctx: Rc<RefCell<Context>>) -> LuaResult<()> {
  let variable_fn = lua.create_function(move |_, (key, value): (String, LuaValue)| {
    let value = match lua_to_value(value)? {
      Value::Absent => return Err(LuaError::external("variable() requires a value")),
      value => value,
    };

    let mut object = Object::new(ObjectKind::Variable);
    object.args.insert("key".to_string(), Value::Str(key));
    object.args.insert("value".to_string(), value);
    let id = ctx.borrow_mut().insert(object);
    Ok(ObjectHandle { ctx: ctx.clone(), id })
  })?;
  nin.set("variable", variable_fn)?;
  Ok(())
}

fn register_default(lua: &Lua, nin: &LuaTable, ctx: Rc<RefCell<Context>>) -> LuaResult<()> {
  let default_fn = lua.create_function(move |_, targets: LuaValue| {
    let targets = match lua_to_value(targets)? {
      Value::Absent => {
        return Err(LuaError::external("default() requires a target or a list of targets"));
      }
      targets => targets,
    };

    let mut object = Object::new(ObjectKind::Default);
    object.args.insert("targets".to_string(), targets);
    let id = ctx.borrow_mut().insert(object);
    Ok(ObjectHandle { ctx: ctx.clone(), id })
  })?;
  nin.set("default", default_fn)?;
  Ok(())
}

fn register_select(lua: &Lua, nin: &LuaTable, ctx: Rc<RefCell<Context>>) -> LuaResult<()> {
  let select_fn = lua.create_function(move |_, spec: LuaTable| {
    let filter = parse_select_table(&spec)?;
    let ids = ctx.borrow().select(&filter).ids().to_vec();
    Ok(SelectionHandle { ctx: ctx.clone(), ids })
  })?;
  nin.set("select", select_fn)?;
  Ok(())
}
