//! Implementation of the `ninlua dump` command.
//!
//! Evaluates a configuration and prints the resulting graph as JSON, in
//! declaration order, for debugging configurations.

use std::path::Path;

use anyhow::{Context, Result};

use ninlua_lib::eval::evaluate_file;
use ninlua_lib::object::Object;

pub fn cmd_dump(config: &str, defines: &[String]) -> Result<()> {
  let options = super::eval_options(defines)?;

  let ctx = evaluate_file(Path::new(config), &options)
    .with_context(|| format!("Failed to evaluate config: {}", config))?;

  let objects: Vec<&Object> = ctx.live().map(|(_, object)| object).collect();
  let json = serde_json::to_string_pretty(&objects).context("Failed to serialize graph")?;
  println!("{}", json);
  Ok(())
}
