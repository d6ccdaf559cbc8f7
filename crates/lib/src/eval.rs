//! Configuration file evaluation.
//!
//! Evaluating a configuration runs the script exactly once against a fresh
//! [`Context`]; every effect is a mutation of that context through the `nin`
//! entry points. The populated context is handed back for serialization and
//! then discarded - there is no state carried between runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::debug;

use crate::context::Context;
use crate::lua::runtime;

/// Errors that can occur during config evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  /// Lua evaluation error, including contract violations raised by the
  /// `nin` entry points.
  #[error("lua error: {0}")]
  Lua(#[from] LuaError),

  #[error("config file not found: {0}")]
  NotFound(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Options for a generation run.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
  /// Key/value defines exposed to the script as `nin.args`.
  pub defines: BTreeMap<String, String>,
}

/// Evaluate a Lua configuration file and return the populated context.
///
/// # Example
/// ```ignore
/// use std::path::Path;
/// use ninlua_lib::eval::{EvalOptions, evaluate_file};
///
/// let ctx = evaluate_file(Path::new("configure.lua"), &EvalOptions::default())?;
/// println!("objects: {}", ctx.len());
/// ```
pub fn evaluate_file(path: &Path, options: &EvalOptions) -> Result<Context, EvalError> {
  if !path.exists() {
    return Err(EvalError::NotFound(path.display().to_string()));
  }

  let source = std::fs::read_to_string(path)?;
  let dir = path.parent().unwrap_or(Path::new("."));
  evaluate_source(&source, &format!("@{}", path.display()), dir, options)
}

/// Evaluate a configuration from a string. Useful for tests and embedded
/// configs.
pub fn evaluate_source(source: &str, chunk_name: &str, dir: &Path, options: &EvalOptions) -> Result<Context, EvalError> {
  let ctx = Rc::new(RefCell::new(Context::new()));

  // Evaluate in a block so the runtime (and every handle it holds) is
  // dropped before we unwrap the context.
  {
    let lua = runtime::create_runtime(ctx.clone(), &options.defines, dir)?;
    lua.load(source).set_name(chunk_name).exec()?;
  }

  let ctx = Rc::try_unwrap(ctx).expect("context still has references").into_inner();
  debug!(objects = ctx.len(), "configuration evaluated");
  Ok(ctx)
}
