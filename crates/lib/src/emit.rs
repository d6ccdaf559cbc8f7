//! Serialization of a [`Context`] to build-file text.
//!
//! Objects serialize in declaration order. Build edges resolve their rule in
//! the index *at write time*; the edge's path lists and variable overrides
//! merge with what the rule contributes:
//!
//! - `outputs`/`inputs`/`implicit`/`order_only`: the edge's own list first,
//!   then the rule's same-named list.
//! - variable overrides: the rule's values first, then the edge's, appended
//!   per key rather than replaced.
//!
//! Everything renders into a buffer; callers write the destination file only
//! once the whole graph serialized successfully.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::context::Context;
use crate::ninja::{NinjaWriter, RuleOpts};
use crate::object::{Object, ObjectKind, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
  #[error("{kind} is missing required field '{field}'")]
  MissingField { kind: &'static str, field: &'static str },

  #[error("field '{field}' on {kind} must be a single string")]
  NotAString { kind: &'static str, field: &'static str },

  #[error("build references unknown rule '{0}'")]
  UnknownRule(String),
}

/// Serialize every live object, in declaration order.
pub fn render(ctx: &Context) -> Result<String, EmitError> {
  let mut writer = NinjaWriter::new();

  for (_, object) in ctx.live() {
    match object.kind {
      ObjectKind::Variable => write_variable(&mut writer, object)?,
      ObjectKind::Rule => write_rule(&mut writer, object)?,
      ObjectKind::Build => write_build(&mut writer, ctx, object)?,
      ObjectKind::Default => write_default(&mut writer, object)?,
    }
  }

  debug!(objects = ctx.len(), "serialized build graph");
  Ok(writer.into_string())
}

/// A required string-valued field, as the error taxonomy wants it reported.
fn required_str<'a>(object: &'a Object, kind: &'static str, field: &'static str) -> Result<&'a str, EmitError> {
  match object.get(field) {
    None | Some(Value::Absent) => Err(EmitError::MissingField { kind, field }),
    Some(Value::Str(s)) => Ok(s),
    Some(Value::List(_)) => Err(EmitError::NotAString { kind, field }),
  }
}

/// An optional field flattened to emission form: lists join with spaces.
fn joined(object: &Object, field: &str) -> Option<String> {
  match object.get(field)? {
    Value::Str(s) => Some(s.clone()),
    Value::List(items) => Some(items.join(" ")),
    Value::Absent => None,
  }
}

fn write_variable(writer: &mut NinjaWriter, object: &Object) -> Result<(), EmitError> {
  let key = required_str(object, "variable", "key")?;
  let value = joined(object, "value").ok_or(EmitError::MissingField {
    kind: "variable",
    field: "value",
  })?;
  writer.variable(key, &value, 0);
  Ok(())
}

fn write_rule(writer: &mut NinjaWriter, object: &Object) -> Result<(), EmitError> {
  let name = required_str(object, "rule", "name")?;
  let command = required_str(object, "rule", "command")?;

  let opts = RuleOpts {
    description: joined(object, "description"),
    depfile: joined(object, "depfile"),
    generator: object.get("generator").is_some(),
    restat: object.get("restat").is_some(),
    rspfile: joined(object, "rspfile"),
    rspfile_content: joined(object, "rspfile_content"),
  };
  writer.rule(name, command, &opts);
  Ok(())
}

fn write_build(writer: &mut NinjaWriter, ctx: &Context, object: &Object) -> Result<(), EmitError> {
  let rule_name = required_str(object, "build", "rule")?;
  let rule = ctx
    .lookup_rule(rule_name)
    .ok_or_else(|| EmitError::UnknownRule(rule_name.to_string()))?;

  // Edge's own paths first, then whatever the rule contributes.
  let combine = |field: &str| -> Vec<String> {
    let mut list = object.list(field);
    list.extend(rule.list(field));
    list
  };

  let outputs = combine("outputs");
  if outputs.is_empty() {
    return Err(EmitError::MissingField {
      kind: "build",
      field: "outputs",
    });
  }

  // Variable overrides: rule defaults first, edge values appended per key.
  let mut variables: BTreeMap<String, Vec<String>> = rule.unknown_vars();
  for (key, values) in object.unknown_vars() {
    variables.entry(key).or_default().extend(values);
  }
  let variables: Vec<(String, String)> = variables.into_iter().map(|(key, values)| (key, values.join(" "))).collect();

  writer.build(
    &outputs,
    rule_name,
    &combine("inputs"),
    &combine("implicit"),
    &combine("order_only"),
    &variables,
  );
  Ok(())
}

fn write_default(writer: &mut NinjaWriter, object: &Object) -> Result<(), EmitError> {
  let targets = object.list("targets");
  if targets.is_empty() {
    return Err(EmitError::MissingField {
      kind: "default",
      field: "targets",
    });
  }
  writer.default(&targets);
  Ok(())
}
