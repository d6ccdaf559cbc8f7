//! Lua runtime construction for configuration evaluation.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;

use crate::context::Context;

use super::globals;

/// Create a new Lua runtime with the `nin` global registered against the
/// shared context. Returns the initialized Lua instance.
pub fn create_runtime(
  ctx: Rc<RefCell<Context>>,
  defines: &BTreeMap<String, String>,
  dir: &Path,
) -> LuaResult<Lua> {
  let lua = Lua::new();
  globals::register_globals(&lua, ctx, defines, dir)?;
  Ok(lua)
}
