//! Graph objects: rules, build edges, variables, and default statements.
//!
//! Every declaration in a configuration script becomes an [`Object`]: a kind,
//! a bag of named attribute values, a tag set, and (on expansion clones) the
//! axis-binding scope the clone was produced with. Attribute values are a
//! closed set of shapes - a single string, a list of strings, or absent - so
//! every operation handles all three exhaustively.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::format::{self, FormatError, Scope};

/// The concrete statement an [`Object`] serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
  Rule,
  Build,
  Variable,
  Default,
}

impl ObjectKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ObjectKind::Rule => "rule",
      ObjectKind::Build => "build",
      ObjectKind::Variable => "variable",
      ObjectKind::Default => "default",
    }
  }
}

/// An attribute value: a single string, a list of strings, or absent.
///
/// `Absent` is an argument shape for [`Object::set`] and [`Object::append`]
/// (meaning "clear" and "no-op" respectively); it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
  Str(String),
  List(Vec<String>),
  Absent,
}

impl Value {
  /// Normalize to a list: absent is empty, a string is a one-element list.
  pub fn into_list(self) -> Vec<String> {
    match self {
      Value::Str(s) => vec![s],
      Value::List(v) => v,
      Value::Absent => Vec::new(),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Str(s.to_string())
  }
}

impl From<Vec<String>> for Value {
  fn from(v: Vec<String>) -> Self {
    Value::List(v)
  }
}

impl From<&[&str]> for Value {
  fn from(v: &[&str]) -> Self {
    Value::List(v.iter().map(|s| s.to_string()).collect())
  }
}

/// Attribute keys of a rule that serialize as part of the `rule` block
/// itself; everything else on a rule is a rule-scoped variable default.
pub const RULE_KNOWN_KEYS: &[&str] = &[
  "name",
  "command",
  "description",
  "depfile",
  "generator",
  "restat",
  "rspfile",
  "rspfile_content",
];

/// Attribute keys of a build edge that form the `build` line itself;
/// everything else is an edge-scoped variable override.
pub const BUILD_KNOWN_KEYS: &[&str] = &["outputs", "rule", "inputs", "implicit", "order_only"];

/// One node of the build graph.
#[derive(Debug, Clone, Serialize)]
pub struct Object {
  pub kind: ObjectKind,
  pub args: BTreeMap<String, Value>,
  pub tags: BTreeSet<String>,
  /// Axis bindings this object was expanded with; the template-resolution
  /// scope for subsequent `set`/`append` calls. Never serialized to the
  /// build file.
  pub keys: Option<Scope>,
}

impl Object {
  pub fn new(kind: ObjectKind) -> Self {
    Self {
      kind,
      args: BTreeMap::new(),
      tags: BTreeSet::new(),
      keys: None,
    }
  }

  fn scope(&self) -> Scope {
    self.keys.clone().unwrap_or_default()
  }

  /// Store an attribute value.
  ///
  /// A list value appends (it does not clear what is already there); a
  /// string value is template-resolved against the binding scope and
  /// replaces any previous value; `Absent` removes the key.
  pub fn set(&mut self, key: &str, value: Value) -> Result<&mut Self, FormatError> {
    match value {
      Value::List(items) => {
        self.append(key, Value::List(items))?;
      }
      Value::Str(s) => {
        let resolved = format::resolve(&s, &self.scope())?;
        self.args.insert(key.to_string(), Value::Str(resolved));
      }
      Value::Absent => {
        self.args.remove(key);
      }
    }
    Ok(self)
  }

  /// Append to an attribute's list, creating it if absent.
  ///
  /// A string value becomes a one-element list; a previously stored string
  /// is coerced to a one-element list before extending; `Absent` is a no-op.
  /// Each appended element is template-resolved against the binding scope.
  pub fn append(&mut self, key: &str, value: Value) -> Result<&mut Self, FormatError> {
    let items = match value {
      Value::Absent => return Ok(self),
      other => other.into_list(),
    };

    let scope = self.scope();
    let resolved: Vec<String> = items
      .iter()
      .map(|item| format::resolve(item, &scope))
      .collect::<Result<_, _>>()?;

    let mut list = match self.args.remove(key) {
      Some(existing) => existing.into_list(),
      None => Vec::new(),
    };
    list.extend(resolved);
    self.args.insert(key.to_string(), Value::List(list));
    Ok(self)
  }

  /// Union tags into the tag set. Tags are stored raw; any placeholders in
  /// them resolve at expansion time.
  pub fn tag(&mut self, tags: Value) -> &mut Self {
    for tag in tags.into_list() {
      self.tags.insert(tag);
    }
    self
  }

  /// Clone this object with the given axis bindings as its scope.
  ///
  /// Every attribute is copied through [`Object::set`], so string values
  /// re-resolve against the new bindings and lists copy element by element
  /// with each element re-resolved. Tags resolve against the new bindings as
  /// well.
  pub fn expand(&self, keys: Scope) -> Result<Object, FormatError> {
    let mut clone = Object::new(self.kind);
    clone.keys = Some(keys);

    for (key, value) in &self.args {
      clone.set(key, value.clone())?;
    }

    let scope = clone.scope();
    for tag in &self.tags {
      let resolved = format::resolve(tag, &scope)?;
      clone.tags.insert(resolved);
    }

    Ok(clone)
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.args.get(key)
  }

  pub fn get_str(&self, key: &str) -> Option<&str> {
    self.args.get(key).and_then(Value::as_str)
  }

  /// The attribute as a list; absent yields an empty list.
  pub fn list(&self, key: &str) -> Vec<String> {
    self.args.get(key).cloned().map(Value::into_list).unwrap_or_default()
  }

  /// Attributes outside the kind's known-key set: the variable defaults a
  /// rule contributes to its edges, or a build edge's own overrides.
  pub fn unknown_vars(&self) -> BTreeMap<String, Vec<String>> {
    let known: &[&str] = match self.kind {
      ObjectKind::Rule => RULE_KNOWN_KEYS,
      ObjectKind::Build => BUILD_KNOWN_KEYS,
      _ => &[],
    };
    self
      .args
      .iter()
      .filter(|(key, _)| !known.contains(&key.as_str()))
      .map(|(key, value)| (key.clone(), value.clone().into_list()))
      .collect()
  }
}
