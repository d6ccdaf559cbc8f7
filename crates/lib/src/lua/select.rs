//! Script-facing query handles.
//!
//! `nin.select{...}` and `handle:for_each{...}` return a [`SelectionHandle`]
//! over the matched objects. The handle narrows with `:And{...}`, lists its
//! objects with `:list()`, answers `#sel`, and projects attributes by plain
//! indexing: `sel.outputs` flattens the `outputs` attribute across every
//! matched object.
//!
//! A select table mixes tags and attribute filters:
//!
//! ```lua
//! nin.select { "gpu", "cpu", rule = "cc", keys = { arch = "32" } }
//! ```
//!
//! Array entries are tags; named entries are attribute filters (string or
//! list of strings); the `keys` entry matches the axis bindings of expansion
//! clones. A tag match admits an object outright, and the attribute filters
//! are OR'd - any one match admits the object.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use mlua::prelude::*;

use crate::context::{Context, ObjectId};
use crate::query::{Expected, Filter, Selection};

use super::object::ObjectHandle;

/// Handle to an ordered set of matched objects.
pub struct SelectionHandle {
  pub ctx: Rc<RefCell<Context>>,
  pub ids: Vec<ObjectId>,
}

/// Parse a select table into the engine's default disjunctive filter.
pub fn parse_select_table(spec: &LuaTable) -> LuaResult<Filter> {
  let mut tags = BTreeSet::new();
  let mut attrs = Vec::new();
  let mut keys = None;

  for pair in spec.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    match key {
      LuaValue::Integer(_) => match value {
        LuaValue::String(tag) => {
          tags.insert(tag.to_str()?.to_string());
        }
        other => {
          return Err(LuaError::external(format!("tags must be strings, got {}", other.type_name())));
        }
      },
      LuaValue::String(name) => {
        let name = name.to_str()?.to_string();
        match value {
          LuaValue::String(s) => attrs.push((name, Expected::Str(s.to_str()?.to_string()))),
          LuaValue::Table(table) => {
            if name == "keys" {
              keys = Some(parse_bindings(&table)?);
            } else {
              attrs.push((name, Expected::List(parse_string_list(&table)?)));
            }
          }
          other => {
            return Err(LuaError::external(format!(
              "filter '{}' must be a string or a list of strings, got {}",
              name,
              other.type_name()
            )));
          }
        }
      }
      other => {
        return Err(LuaError::external(format!(
          "select entries must be tags or named filters, got key of type {}",
          other.type_name()
        )));
      }
    }
  }

  Ok(Filter::disjunction(tags, attrs, keys))
}

fn parse_string_list(table: &LuaTable) -> LuaResult<Vec<String>> {
  let mut items = Vec::with_capacity(table.raw_len());
  for item in table.sequence_values::<LuaValue>() {
    match item? {
      LuaValue::String(s) => items.push(s.to_str()?.to_string()),
      other => {
        return Err(LuaError::external(format!(
          "filter lists must contain strings, got {}",
          other.type_name()
        )));
      }
    }
  }
  Ok(items)
}

fn parse_bindings(table: &LuaTable) -> LuaResult<BTreeMap<String, String>> {
  let mut bindings = BTreeMap::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let (LuaValue::String(key), LuaValue::String(value)) = (key, value) else {
      return Err(LuaError::external("'keys' takes a table of axis-name/value strings"));
    };
    bindings.insert(key.to_str()?.to_string(), value.to_str()?.to_string());
  }
  Ok(bindings)
}

impl LuaUserData for SelectionHandle {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_method("And", |_, this, spec: LuaTable| {
      let filter = parse_select_table(&spec)?;
      let narrowed = {
        let ctx = this.ctx.borrow();
        Selection::from_ids(this.ids.clone()).and(&ctx, &filter)
      };
      Ok(SelectionHandle {
        ctx: this.ctx.clone(),
        ids: narrowed.ids().to_vec(),
      })
    });

    methods.add_method("list", |_, this, ()| {
      let handles: Vec<ObjectHandle> = this
        .ids
        .iter()
        .map(|&id| ObjectHandle {
          ctx: this.ctx.clone(),
          id,
        })
        .collect();
      Ok(handles)
    });

    methods.add_meta_method(mlua::MetaMethod::Len, |_, this, ()| Ok(this.ids.len()));

    // `sel.attr` flattens the attribute across every matched object.
    methods.add_meta_method(mlua::MetaMethod::Index, |lua, this, key: String| {
      let values = {
        let ctx = this.ctx.borrow();
        Selection::from_ids(this.ids.clone()).collect_attr(&ctx, &key)
      };
      let table = lua.create_table()?;
      for (i, value) in values.iter().enumerate() {
        table.set(i + 1, value.as_str())?;
      }
      Ok(LuaValue::Table(table))
    });
  }
}
