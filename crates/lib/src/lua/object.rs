//! Script-facing handles to graph objects.
//!
//! Factories like `nin.rule{}` return an [`ObjectHandle`] userdata. Its
//! mutation methods (`set`, `append`, `tag`) return the handle itself so
//! declarations chain; `for_each{}` expands the object across axis values
//! and hands back a selection of the clones. Reading any other key off the
//! handle yields the attribute's current value.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mlua::prelude::*;

use crate::context::{Context, ObjectId};
use crate::object::Value;

use super::select::SelectionHandle;

/// Handle to one object in the shared context.
pub struct ObjectHandle {
  pub ctx: Rc<RefCell<Context>>,
  pub id: ObjectId,
}

/// Convert a script value into an attribute value. The accepted shapes are
/// the attribute contract: a string, a list of strings, or nil.
pub fn lua_to_value(value: LuaValue) -> LuaResult<Value> {
  match value {
    LuaValue::Nil => Ok(Value::Absent),
    LuaValue::String(s) => Ok(Value::Str(s.to_str()?.to_string())),
    LuaValue::Table(t) => {
      let mut items = Vec::with_capacity(t.raw_len());
      for item in t.sequence_values::<LuaValue>() {
        match item? {
          LuaValue::String(s) => items.push(s.to_str()?.to_string()),
          other => {
            return Err(LuaError::external(format!(
              "list elements must be strings, got {}",
              other.type_name()
            )));
          }
        }
      }
      Ok(Value::List(items))
    }
    other => Err(LuaError::external(format!(
      "value must be a string, a list of strings, or nil, got {}",
      other.type_name()
    ))),
  }
}

/// Convert an attribute value back into a script value.
pub fn value_to_lua(lua: &Lua, value: Option<&Value>) -> LuaResult<LuaValue> {
  match value {
    None | Some(Value::Absent) => Ok(LuaValue::Nil),
    Some(Value::Str(s)) => Ok(LuaValue::String(lua.create_string(s)?)),
    Some(Value::List(items)) => {
      let table = lua.create_table()?;
      for (i, item) in items.iter().enumerate() {
        table.set(i + 1, item.as_str())?;
      }
      Ok(LuaValue::Table(table))
    }
  }
}

fn parse_axes(axes: &LuaTable) -> LuaResult<BTreeMap<String, Vec<String>>> {
  let mut parsed = BTreeMap::new();
  for pair in axes.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    let LuaValue::String(name) = key else {
      return Err(LuaError::external("for_each{} axes must be named"));
    };
    let name = name.to_str()?.to_string();
    let values = match lua_to_value(value)? {
      Value::Str(s) => vec![s],
      Value::List(items) => items,
      Value::Absent => {
        return Err(LuaError::external(format!(
          "axis '{}' must be a string or a list of strings",
          name
        )));
      }
    };
    parsed.insert(name, values);
  }
  Ok(parsed)
}

impl LuaUserData for ObjectHandle {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_function("set", |_, (ud, key, value): (LuaAnyUserData, String, LuaValue)| {
      let value = lua_to_value(value)?;
      {
        let this = ud.borrow::<ObjectHandle>()?;
        let mut ctx = this.ctx.borrow_mut();
        ctx.get_mut(this.id).set(&key, value).map_err(LuaError::external)?;
      }
      Ok(ud)
    });

    methods.add_function("append", |_, (ud, key, value): (LuaAnyUserData, String, LuaValue)| {
      let value = lua_to_value(value)?;
      {
        let this = ud.borrow::<ObjectHandle>()?;
        let mut ctx = this.ctx.borrow_mut();
        ctx.get_mut(this.id).append(&key, value).map_err(LuaError::external)?;
      }
      Ok(ud)
    });

    methods.add_function("tag", |_, (ud, tags): (LuaAnyUserData, LuaValue)| {
      let tags = match lua_to_value(tags)? {
        Value::Absent => {
          return Err(LuaError::external("tag requires a string or a list of strings"));
        }
        tags => tags,
      };
      {
        let this = ud.borrow::<ObjectHandle>()?;
        let mut ctx = this.ctx.borrow_mut();
        ctx.get_mut(this.id).tag(tags);
      }
      Ok(ud)
    });

    methods.add_method("for_each", |_, this, axes: LuaTable| {
      let axes = parse_axes(&axes)?;
      let ids = this.ctx.borrow_mut().for_each(this.id, &axes).map_err(LuaError::external)?;
      Ok(SelectionHandle {
        ctx: this.ctx.clone(),
        ids,
      })
    });

    // Attribute reads fall through to the object's current value.
    methods.add_meta_method(mlua::MetaMethod::Index, |lua, this, key: String| {
      let ctx = this.ctx.borrow();
      value_to_lua(lua, ctx.get(this.id).get(&key))
    });
  }
}
