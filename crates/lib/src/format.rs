//! Template placeholder resolution.
//!
//! Attribute values and tags may contain `{name}` or `{name:spec}`
//! placeholders that are resolved against a scope of axis bindings. A name
//! missing from the scope is not an error: the placeholder is re-emitted
//! verbatim, so a template can be partially resolved now and resolved again
//! later once more bindings are known.
//!
//! # Placeholder Formats
//!
//! - `{name}` - substitute the binding for `name`
//! - `{name:-ext}` - substitute the binding with its filename extension
//!   stripped
//! - `{name:>8}` - substitute with a generic string-format directive
//!   (`[[fill]align][width][.precision]`)
//! - `{{` / `}}` - literal braces
//!
//! # Example
//!
//! ```
//! use ninlua_lib::format::{Scope, resolve};
//!
//! let mut scope = Scope::new();
//! scope.insert("arch".to_string(), "64".to_string());
//! let out = resolve("out/app_{arch}.o from {src:-ext}.cc", &scope).unwrap();
//! assert_eq!(out, "out/app_64.o from {src:-ext}.cc");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// Mapping from placeholder name to its bound value.
pub type Scope = BTreeMap<String, String>;

/// A segment of parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (brace escapes already unescaped).
  Literal(String),

  /// A `{name}` or `{name:spec}` placeholder.
  Field { name: String, spec: Option<String> },
}

/// Errors raised for malformed templates or format specs.
///
/// Note that an unknown placeholder *name* is never an error; only broken
/// markup is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("single '}}' without matching '{{' at position {0}")]
  StrayClose(usize),

  #[error("invalid format spec '{0}'")]
  BadSpec(String),
}

/// Parse a template into literal and placeholder segments.
///
/// `{{` and `}}` unescape into literal braces. A lone `{` or `}` is a
/// [`FormatError`].
pub fn parse(template: &str) -> Result<Vec<Segment>, FormatError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = template.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    match ch {
      '{' => {
        if chars.peek().map(|&(_, c)| c) == Some('{') {
          chars.next();
          literal.push('{');
          continue;
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        let mut content = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          content.push(c);
        }
        if !found_close {
          return Err(FormatError::Unclosed(pos));
        }

        let (name, spec) = match content.split_once(':') {
          Some((name, spec)) => (name.to_string(), Some(spec.to_string())),
          None => (content, None),
        };
        segments.push(Segment::Field { name, spec });
      }
      '}' => {
        if chars.peek().map(|&(_, c)| c) == Some('}') {
          chars.next();
          literal.push('}');
        } else {
          return Err(FormatError::StrayClose(pos));
        }
      }
      _ => literal.push(ch),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Resolve all placeholders in `template` against `scope`.
///
/// Placeholders whose name is not bound in `scope` pass through verbatim,
/// markup included. Resolution is a single pass: substituted values are not
/// re-scanned for placeholders.
pub fn resolve(template: &str, scope: &Scope) -> Result<String, FormatError> {
  let segments = parse(template)?;
  let mut result = String::new();

  for segment in &segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Field { name, spec } => match scope.get(name) {
        Some(value) => match spec.as_deref() {
          None | Some("") => result.push_str(value),
          Some(spec) => result.push_str(&apply_spec(value, spec)?),
        },
        None => {
          // Re-emit the original markup for later resolution.
          result.push('{');
          result.push_str(name);
          if let Some(spec) = spec {
            result.push(':');
            result.push_str(spec);
          }
          result.push('}');
        }
      },
    }
  }

  Ok(result)
}

/// Split a path into `(stem, extension)` at the last `.` of the final
/// component. A leading dot is part of the name, not an extension.
pub fn split_ext(path: &str) -> (&str, &str) {
  let base_start = path.rfind('/').map_or(0, |i| i + 1);
  let base = &path[base_start..];

  let Some(dot) = base.rfind('.') else {
    return (path, "");
  };
  // Only split when a non-dot character precedes the dot within the
  // final component.
  if base[..dot].chars().any(|c| c != '.') {
    let split = base_start + dot;
    (&path[..split], &path[split..])
  } else {
    (path, "")
  }
}

/// Apply a format spec to a bound string value.
///
/// `-ext` strips the filename extension; anything else is treated as a
/// string-format directive of the shape `[[fill]align][width][.precision]`
/// with an optional trailing `s`.
fn apply_spec(value: &str, spec: &str) -> Result<String, FormatError> {
  if spec == "-ext" {
    return Ok(split_ext(value).0.to_string());
  }

  let chars: Vec<char> = spec.chars().collect();
  let mut fill = ' ';
  let mut align = '<';
  let mut i = 0;

  if chars.len() >= 2 && matches!(chars[1], '<' | '^' | '>') {
    fill = chars[0];
    align = chars[1];
    i = 2;
  } else if !chars.is_empty() && matches!(chars[0], '<' | '^' | '>') {
    align = chars[0];
    i = 1;
  }

  let mut width = 0usize;
  while i < chars.len() && chars[i].is_ascii_digit() {
    width = width * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
    i += 1;
  }

  let mut precision = None;
  if i < chars.len() && chars[i] == '.' {
    i += 1;
    let mut p = 0usize;
    let mut digits = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
      p = p * 10 + chars[i].to_digit(10).unwrap_or(0) as usize;
      i += 1;
      digits += 1;
    }
    if digits == 0 {
      return Err(FormatError::BadSpec(spec.to_string()));
    }
    precision = Some(p);
  }

  if i < chars.len() && chars[i] == 's' {
    i += 1;
  }
  if i != chars.len() {
    return Err(FormatError::BadSpec(spec.to_string()));
  }

  let mut s: String = match precision {
    Some(p) => value.chars().take(p).collect(),
    None => value.to_string(),
  };

  let len = s.chars().count();
  if len < width {
    let pad = width - len;
    match align {
      '<' => s.extend(std::iter::repeat_n(fill, pad)),
      '>' => s = std::iter::repeat_n(fill, pad).collect::<String>() + &s,
      '^' => {
        let left = pad / 2;
        s = std::iter::repeat_n(fill, left).collect::<String>() + &s;
        s.extend(std::iter::repeat_n(fill, pad - left));
      }
      _ => {}
    }
  }

  Ok(s)
}
