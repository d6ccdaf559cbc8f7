//! Graph queries: predicate trees over objects and chainable selections.
//!
//! Matching is expressed as an explicit [`Filter`] tree rather than a loop,
//! so the engine's default query shape - a *disjunction* of a tag test and
//! the individual attribute tests - is a visible, testable value. That OR is
//! load-bearing: a tag match admits an object regardless of its attributes,
//! and any single matching attribute filter admits an object the other
//! filters reject. Callers wanting conjunction say so with [`Filter::All`].

use std::collections::BTreeSet;

use crate::context::{Context, ObjectId};
use crate::format::Scope;
use crate::object::{Object, Value};

/// The value an attribute filter compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
  Str(String),
  List(Vec<String>),
}

/// A predicate over a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
  /// Non-empty intersection with the object's tag set.
  Tags(BTreeSet<String>),

  /// Structural match against one declared attribute. An object lacking the
  /// attribute never matches this node (the filter is skipped for it).
  Attr { name: String, expected: Expected },

  /// Subset containment against the axis bindings an expansion clone was
  /// produced with. Objects that were never expanded have no bindings and
  /// never match.
  Keys(Scope),

  Any(Vec<Filter>),
  All(Vec<Filter>),
  Not(Box<Filter>),
}

impl Filter {
  /// The engine's default query shape: tags OR'd with every attribute
  /// filter. An empty disjunction matches nothing.
  pub fn disjunction(tags: BTreeSet<String>, attrs: Vec<(String, Expected)>, keys: Option<Scope>) -> Filter {
    let mut nodes = Vec::new();
    if !tags.is_empty() {
      nodes.push(Filter::Tags(tags));
    }
    for (name, expected) in attrs {
      nodes.push(Filter::Attr { name, expected });
    }
    if let Some(keys) = keys {
      nodes.push(Filter::Keys(keys));
    }
    Filter::Any(nodes)
  }

  pub fn matches(&self, object: &Object) -> bool {
    match self {
      Filter::Tags(tags) => object.tags.iter().any(|tag| tags.contains(tag)),
      Filter::Attr { name, expected } => match object.get(name) {
        Some(value) => attr_matches(value, expected),
        None => false,
      },
      Filter::Keys(want) => match &object.keys {
        Some(have) => want.iter().all(|(key, value)| have.get(key) == Some(value)),
        None => false,
      },
      Filter::Any(filters) => filters.iter().any(|filter| filter.matches(object)),
      Filter::All(filters) => filters.iter().all(|filter| filter.matches(object)),
      Filter::Not(filter) => !filter.matches(object),
    }
  }
}

fn attr_matches(value: &Value, expected: &Expected) -> bool {
  match (value, expected) {
    // List-valued attribute: expected list must be contained; an expected
    // scalar must be a member.
    (Value::List(have), Expected::List(want)) => want.iter().all(|w| have.contains(w)),
    (Value::List(have), Expected::Str(want)) => have.contains(want),
    // Scalar attribute: membership in an expected list, else equality.
    (Value::Str(have), Expected::List(want)) => want.contains(have),
    (Value::Str(have), Expected::Str(want)) => have == want,
    (Value::Absent, _) => false,
  }
}

/// An ordered set of matched objects, chainable and projectable.
#[derive(Debug, Clone, Default)]
pub struct Selection {
  ids: Vec<ObjectId>,
}

impl Selection {
  pub fn from_ids(ids: Vec<ObjectId>) -> Self {
    Self { ids }
  }

  pub fn ids(&self) -> &[ObjectId] {
    &self.ids
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  /// Narrow this selection with a further filter.
  pub fn and(&self, ctx: &Context, filter: &Filter) -> Selection {
    Selection {
      ids: self.ids.iter().copied().filter(|&id| filter.matches(ctx.get(id))).collect(),
    }
  }

  pub fn iter<'a>(&'a self, ctx: &'a Context) -> impl Iterator<Item = &'a Object> {
    self.ids.iter().map(|&id| ctx.get(id))
  }

  /// Flatten one attribute across every matched object: list values
  /// concatenate, scalar values collect, objects lacking the attribute
  /// contribute nothing.
  pub fn collect_attr(&self, ctx: &Context, name: &str) -> Vec<String> {
    let mut result = Vec::new();
    for object in self.iter(ctx) {
      match object.get(name) {
        Some(Value::Str(s)) => result.push(s.clone()),
        Some(Value::List(items)) => result.extend(items.iter().cloned()),
        Some(Value::Absent) | None => {}
      }
    }
    result
  }
}

impl Context {
  /// Query the live object set, in declaration order.
  pub fn select(&self, filter: &Filter) -> Selection {
    Selection {
      ids: self.live().filter(|(_, object)| filter.matches(object)).map(|(id, _)| id).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::object::ObjectKind;

  fn tagged(tags: &[&str]) -> Object {
    let mut o = Object::new(ObjectKind::Build);
    o.tag(Value::List(tags.iter().map(|t| t.to_string()).collect()));
    o
  }

  fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
  }

  fn attr(name: &str, expected: Expected) -> Filter {
    Filter::Attr {
      name: name.to_string(),
      expected,
    }
  }

  mod tag_matching {
    use super::*;

    #[test]
    fn tag_intersection_selects() {
      let mut ctx = Context::new();
      let gpu = ctx.insert(tagged(&["gpu"]));
      ctx.insert(tagged(&["cpu"]));

      let selection = ctx.select(&Filter::disjunction(tag_set(&["gpu"]), Vec::new(), None));
      assert_eq!(selection.ids(), &[gpu]);
    }

    #[test]
    fn tag_match_ignores_attribute_filters() {
      let mut ctx = Context::new();
      let gpu = ctx.insert(tagged(&["gpu"]));
      ctx.insert(tagged(&["cpu"]));

      // The attribute filter matches nothing, but the tag admits the object
      // on its own.
      let filter = Filter::disjunction(
        tag_set(&["gpu"]),
        vec![("rule".to_string(), Expected::Str("nonexistent".to_string()))],
        None,
      );
      assert_eq!(ctx.select(&filter).ids(), &[gpu]);
    }

    #[test]
    fn empty_disjunction_matches_nothing() {
      let mut ctx = Context::new();
      ctx.insert(tagged(&["gpu"]));
      assert!(ctx.select(&Filter::Any(Vec::new())).is_empty());
    }
  }

  mod attr_matching {
    use super::*;

    fn with_attr(key: &str, value: Value) -> Object {
      let mut o = Object::new(ObjectKind::Build);
      o.set(key, value).unwrap();
      o
    }

    #[test]
    fn scalar_equality() {
      let o = with_attr("rule", "cc".into());
      assert!(attr("rule", Expected::Str("cc".to_string())).matches(&o));
      assert!(!attr("rule", Expected::Str("link".to_string())).matches(&o));
    }

    #[test]
    fn scalar_in_expected_list() {
      let o = with_attr("rule", "cc".into());
      let f = attr("rule", Expected::List(vec!["cc".to_string(), "cxx".to_string()]));
      assert!(f.matches(&o));
    }

    #[test]
    fn list_contains_expected_scalar() {
      let o = with_attr("flags", Value::List(vec!["-g".to_string(), "-O2".to_string()]));
      assert!(attr("flags", Expected::Str("-O2".to_string())).matches(&o));
      assert!(!attr("flags", Expected::Str("-O3".to_string())).matches(&o));
    }

    #[test]
    fn list_contains_every_expected_element() {
      let o = with_attr(
        "flags",
        Value::List(vec!["-g".to_string(), "-O2".to_string(), "-Wall".to_string()]),
      );
      assert!(attr("flags", Expected::List(vec!["-O2".to_string(), "-g".to_string()])).matches(&o));
      assert!(!attr("flags", Expected::List(vec!["-O2".to_string(), "-O3".to_string()])).matches(&o));
    }

    #[test]
    fn absent_attribute_skips_the_filter() {
      let o = Object::new(ObjectKind::Build);
      assert!(!attr("rule", Expected::Str("cc".to_string())).matches(&o));
    }

    #[test]
    fn or_of_attribute_filters_is_load_bearing() {
      // One matching filter admits the object even though the other filter
      // rejects it. Conjunction must be requested explicitly with All.
      let mut o = Object::new(ObjectKind::Build);
      o.set("rule", "cc".into()).unwrap();
      o.set("mode", "debug".into()).unwrap();

      let or = Filter::disjunction(
        BTreeSet::new(),
        vec![
          ("rule".to_string(), Expected::Str("cc".to_string())),
          ("mode".to_string(), Expected::Str("release".to_string())),
        ],
        None,
      );
      assert!(or.matches(&o));

      let and = Filter::All(vec![
        attr("rule", Expected::Str("cc".to_string())),
        attr("mode", Expected::Str("release".to_string())),
      ]);
      assert!(!and.matches(&o));
    }
  }

  mod keys_matching {
    use super::*;

    #[test]
    fn subset_of_axis_bindings_matches() {
      let mut ctx = Context::new();
      let mut o = Object::new(ObjectKind::Build);
      o.set("out", "{arch}-{mode}".into()).unwrap();
      let id = ctx.insert(o);
      let axes = [
        ("arch".to_string(), vec!["32".to_string(), "64".to_string()]),
        ("mode".to_string(), vec!["debug".to_string()]),
      ]
      .into_iter()
      .collect();
      ctx.for_each(id, &axes).unwrap();

      let want: Scope = [("arch".to_string(), "32".to_string())].into_iter().collect();
      let selection = ctx.select(&Filter::Keys(want));
      assert_eq!(selection.len(), 1);
      assert_eq!(selection.iter(&ctx).next().unwrap().get_str("out"), Some("32-debug"));
    }

    #[test]
    fn unexpanded_objects_never_match_keys() {
      let mut ctx = Context::new();
      ctx.insert(Object::new(ObjectKind::Build));
      let want: Scope = [("arch".to_string(), "32".to_string())].into_iter().collect();
      assert!(ctx.select(&Filter::Keys(want)).is_empty());
    }
  }

  mod combinators {
    use super::*;

    #[test]
    fn not_inverts() {
      let o = tagged(&["gpu"]);
      let f = Filter::Not(Box::new(Filter::Tags(tag_set(&["gpu"]))));
      assert!(!f.matches(&o));
      assert!(f.matches(&tagged(&["cpu"])));
    }

    #[test]
    fn empty_all_matches_everything() {
      assert!(Filter::All(Vec::new()).matches(&Object::new(ObjectKind::Build)));
    }
  }

  mod selection {
    use super::*;

    #[test]
    fn and_narrows() {
      let mut ctx = Context::new();
      let mut a = tagged(&["code"]);
      a.set("mode", "debug".into()).unwrap();
      let a = ctx.insert(a);
      let mut b = tagged(&["code"]);
      b.set("mode", "release".into()).unwrap();
      let b = ctx.insert(b);

      let all = ctx.select(&Filter::Tags(tag_set(&["code"])));
      assert_eq!(all.ids(), &[a, b]);

      let debug = all.and(&ctx, &attr("mode", Expected::Str("debug".to_string())));
      assert_eq!(debug.ids(), &[a]);
    }

    #[test]
    fn projection_flattens_in_order() {
      let mut ctx = Context::new();
      let mut a = tagged(&["data"]);
      a.append("outputs", Value::List(vec!["a.o".to_string(), "b.o".to_string()])).unwrap();
      ctx.insert(a);
      let mut b = tagged(&["data"]);
      b.set("outputs", "c.o".into()).unwrap();
      ctx.insert(b);
      // No outputs attribute at all: contributes nothing.
      ctx.insert(tagged(&["data"]));

      let selection = ctx.select(&Filter::Tags(tag_set(&["data"])));
      assert_eq!(selection.collect_attr(&ctx, "outputs"), vec!["a.o", "b.o", "c.o"]);
    }
  }
}
