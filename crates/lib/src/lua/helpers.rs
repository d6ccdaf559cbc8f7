//! List and path utilities exposed to configuration scripts.
//!
//! - `nin.glob(pattern, ...)` - expand glob patterns to a file list
//! - `nin.prefix(prefix, value)` - prepend a prefix to a string or each list
//!   element
//! - `nin.exclude(list, regex, ...)` - drop entries matching any regex
//! - `nin.path.{join,dirname,basename,noext,ext}` - path pieces

use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::format::split_ext;
use crate::object::Value;

use super::object::lua_to_value;

pub fn register_helpers(lua: &Lua, nin: &LuaTable) -> LuaResult<()> {
  let glob_fn = lua.create_function(|_, patterns: mlua::Variadic<String>| {
    let mut files = Vec::new();
    for pattern in patterns.iter() {
      let entries =
        glob::glob(pattern).map_err(|e| LuaError::external(format!("bad glob pattern '{}': {}", pattern, e)))?;
      for entry in entries.filter_map(Result::ok) {
        files.push(entry.to_string_lossy().into_owned());
      }
    }
    Ok(files)
  })?;
  nin.set("glob", glob_fn)?;

  let prefix_fn = lua.create_function(|lua, (prefix, value): (String, LuaValue)| match lua_to_value(value)? {
    Value::Str(s) => Ok(LuaValue::String(lua.create_string(format!("{}{}", prefix, s))?)),
    Value::List(items) => {
      let table = lua.create_table()?;
      for (i, item) in items.iter().enumerate() {
        table.set(i + 1, format!("{}{}", prefix, item))?;
      }
      Ok(LuaValue::Table(table))
    }
    Value::Absent => Err(LuaError::external("prefix requires a string or a list of strings")),
  })?;
  nin.set("prefix", prefix_fn)?;

  let exclude_fn = lua.create_function(|_, (list, patterns): (Vec<String>, mlua::Variadic<String>)| {
    let regexes: Vec<regex::Regex> = patterns
      .iter()
      .map(|p| regex::Regex::new(p).map_err(|e| LuaError::external(format!("bad regex '{}': {}", p, e))))
      .collect::<LuaResult<_>>()?;
    let kept: Vec<String> = list
      .into_iter()
      .filter(|item| !regexes.iter().any(|re| re.is_match(item)))
      .collect();
    Ok(kept)
  })?;
  nin.set("exclude", exclude_fn)?;

  nin.set("path", create_path_helpers(lua)?)?;
  Ok(())
}

fn create_path_helpers(lua: &Lua) -> LuaResult<LuaTable> {
  let path = lua.create_table()?;

  let join = lua.create_function(|_, segments: mlua::Variadic<String>| {
    let mut joined = PathBuf::new();
    for segment in segments.iter() {
      joined.push(segment);
    }
    Ok(joined.to_string_lossy().into_owned())
  })?;
  path.set("join", join)?;

  let dirname = lua.create_function(|_, p: String| {
    Ok(
      Path::new(&p)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default(),
    )
  })?;
  path.set("dirname", dirname)?;

  let basename = lua.create_function(|_, p: String| {
    Ok(
      Path::new(&p)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default(),
    )
  })?;
  path.set("basename", basename)?;

  let noext = lua.create_function(|_, p: String| Ok(split_ext(&p).0.to_string()))?;
  path.set("noext", noext)?;

  let ext = lua.create_function(|_, p: String| Ok(split_ext(&p).1.to_string()))?;
  path.set("ext", ext)?;

  Ok(path)
}
