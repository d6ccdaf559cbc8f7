//! Implementation of the `ninlua gen` command.
//!
//! Evaluates a Lua configuration and writes the serialized build graph. The
//! graph renders into a buffer first; the destination file is only touched
//! after the whole serialization succeeded, so a failing run never leaves a
//! truncated build file behind.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use ninlua_lib::emit::render;
use ninlua_lib::eval::evaluate_file;

use crate::output;

pub fn cmd_gen(config: &str, out: &str, defines: &[String]) -> Result<()> {
  let options = super::eval_options(defines)?;

  output::info(&format!("Evaluating {}", config));
  let ctx = evaluate_file(Path::new(config), &options)
    .with_context(|| format!("Failed to evaluate config: {}", config))?;

  let text = render(&ctx).context("Failed to serialize build graph")?;

  fs::write(out, &text).with_context(|| format!("Failed to write build file: {}", out))?;

  output::success(&format!("Wrote {} ({} objects)", out, ctx.len()));
  Ok(())
}
