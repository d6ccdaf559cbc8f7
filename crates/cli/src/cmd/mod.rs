mod check;
mod dump;
mod r#gen;

pub use check::cmd_check;
pub use dump::cmd_dump;
pub use r#gen::cmd_gen;

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use ninlua_lib::eval::EvalOptions;

/// Parse repeated `KEY=VALUE` defines into evaluation options.
pub(crate) fn eval_options(defines: &[String]) -> Result<EvalOptions> {
  let mut parsed = BTreeMap::new();
  for define in defines {
    let Some((key, value)) = define.split_once('=') else {
      bail!("invalid define '{}', expected KEY=VALUE", define);
    };
    parsed.insert(key.to_string(), value.to_string());
  }
  Ok(EvalOptions { defines: parsed })
}
