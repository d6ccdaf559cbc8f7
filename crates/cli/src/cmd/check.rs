//! Implementation of the `ninlua check` command.
//!
//! Evaluates a configuration and serializes the graph to a throwaway buffer,
//! reporting what a `gen` run would produce without writing anything.

use std::path::Path;

use anyhow::{Context, Result};

use ninlua_lib::emit::render;
use ninlua_lib::eval::evaluate_file;
use ninlua_lib::object::ObjectKind;

use crate::output;

pub fn cmd_check(config: &str, defines: &[String]) -> Result<()> {
  let options = super::eval_options(defines)?;

  let ctx = evaluate_file(Path::new(config), &options)
    .with_context(|| format!("Failed to evaluate config: {}", config))?;

  let text = render(&ctx).context("Failed to serialize build graph")?;

  let count = |kind: ObjectKind| ctx.live().filter(|(_, o)| o.kind == kind).count();
  println!("Rules: {}", count(ObjectKind::Rule));
  println!("Builds: {}", count(ObjectKind::Build));
  println!("Variables: {}", count(ObjectKind::Variable));
  println!("Defaults: {}", count(ObjectKind::Default));
  println!("Lines: {}", text.lines().count());

  output::success("Configuration is valid");
  Ok(())
}
