//! Low-level writer for the ninja build-file syntax.
//!
//! Emits `rule` blocks, `build` edge lines, top-level `key = value`
//! variables, and `default` lines into a string buffer. Paths on build and
//! default lines get ninja's `$`-escaping for spaces and colons; everything
//! else (commands, variable values) is emitted verbatim so `$in`, `$out` and
//! friends reach the executor untouched.

/// Escape a path for use on a `build` or `default` line.
pub fn escape_path(path: &str) -> String {
  path.replace("$ ", "$$ ").replace(' ', "$ ").replace(':', "$:")
}

/// Optional fields of a `rule` block.
#[derive(Debug, Default)]
pub struct RuleOpts {
  pub description: Option<String>,
  pub depfile: Option<String>,
  pub generator: bool,
  pub restat: bool,
  pub rspfile: Option<String>,
  pub rspfile_content: Option<String>,
}

/// Accumulates build-file text; the caller flushes the finished buffer to
/// disk only after every statement emitted successfully.
#[derive(Debug, Default)]
pub struct NinjaWriter {
  out: String,
}

impl NinjaWriter {
  pub fn new() -> Self {
    <Self as Default>::default()
  }

  /// `key = value`, indented one level per `indent`. Empty values are
  /// skipped entirely.
  pub fn variable(&mut self, key: &str, value: &str, indent: usize) {
    if value.is_empty() {
      return;
    }
    for _ in 0..indent {
      self.out.push_str("  ");
    }
    self.out.push_str(key);
    self.out.push_str(" = ");
    self.out.push_str(value);
    self.out.push('\n');
  }

  pub fn rule(&mut self, name: &str, command: &str, opts: &RuleOpts) {
    self.out.push_str("rule ");
    self.out.push_str(name);
    self.out.push('\n');
    self.variable("command", command, 1);
    if let Some(description) = &opts.description {
      self.variable("description", description, 1);
    }
    if let Some(depfile) = &opts.depfile {
      self.variable("depfile", depfile, 1);
    }
    if opts.generator {
      self.variable("generator", "1", 1);
    }
    if opts.restat {
      self.variable("restat", "1", 1);
    }
    if let Some(rspfile) = &opts.rspfile {
      self.variable("rspfile", rspfile, 1);
    }
    if let Some(rspfile_content) = &opts.rspfile_content {
      self.variable("rspfile_content", rspfile_content, 1);
    }
  }

  pub fn build(
    &mut self,
    outputs: &[String],
    rule: &str,
    inputs: &[String],
    implicit: &[String],
    order_only: &[String],
    variables: &[(String, String)],
  ) {
    self.out.push_str("build ");
    self.push_paths(outputs, " ");
    self.out.push_str(": ");
    self.out.push_str(rule);
    if !inputs.is_empty() {
      self.out.push(' ');
      self.push_paths(inputs, " ");
    }
    if !implicit.is_empty() {
      self.out.push_str(" | ");
      self.push_paths(implicit, " ");
    }
    if !order_only.is_empty() {
      self.out.push_str(" || ");
      self.push_paths(order_only, " ");
    }
    self.out.push('\n');

    for (key, value) in variables {
      self.variable(key, value, 1);
    }
  }

  pub fn default(&mut self, targets: &[String]) {
    self.out.push_str("default ");
    self.push_paths(targets, " ");
    self.out.push('\n');
  }

  fn push_paths(&mut self, paths: &[String], separator: &str) {
    let mut first = true;
    for path in paths {
      if !first {
        self.out.push_str(separator);
      }
      first = false;
      self.out.push_str(&escape_path(path));
    }
  }

  pub fn into_string(self) -> String {
    self.out
  }
}
