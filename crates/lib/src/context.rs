//! The build-graph context: an arena of objects plus the rule-name index.
//!
//! A context is constructed once per generation run, populated by the
//! configuration script, serialized exactly once, and discarded. Objects get
//! stable ids; removal (during expansion) tombstones the slot instead of
//! shifting the arena, so ids handed out to the script stay valid and
//! iteration order is always declaration order.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::format::{FormatError, Scope};
use crate::object::{Object, ObjectKind};

/// Stable handle to an object in a [`Context`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

#[derive(Debug)]
struct Slot {
  object: Object,
  retired: bool,
}

/// Owns every declared object and the rule-name index.
#[derive(Debug, Default)]
pub struct Context {
  slots: Vec<Slot>,
  rules: HashMap<String, ObjectId>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append an object to the arena. Rules register under their current
  /// `name`; registration is last-writer-wins.
  pub fn insert(&mut self, object: Object) -> ObjectId {
    let id = ObjectId(self.slots.len());
    if object.kind == ObjectKind::Rule
      && let Some(name) = object.get_str("name")
    {
      let name = name.to_string();
      self.register_rule(&name, id);
    }
    self.slots.push(Slot { object, retired: false });
    id
  }

  /// Point the rule index at `id`. A later registration under the same name
  /// replaces the earlier one for all subsequent lookups.
  pub fn register_rule(&mut self, name: &str, id: ObjectId) {
    if self.rules.insert(name.to_string(), id).is_some() {
      warn!(rule = name, "rule redeclared, later declaration wins");
    }
  }

  /// Drop the index entry for `name`, but only while it still points at
  /// `id`; a shadowed registration never unregisters its shadower.
  pub fn unregister_rule(&mut self, name: &str, id: ObjectId) {
    if self.rules.get(name) == Some(&id) {
      self.rules.remove(name);
    }
  }

  /// Tombstone an object. The slot stays addressable (script handles remain
  /// usable) but the object no longer appears in iteration or serialization.
  pub fn retire(&mut self, id: ObjectId) {
    let slot = &mut self.slots[id.0];
    if slot.retired {
      return;
    }
    slot.retired = true;

    if slot.object.kind == ObjectKind::Rule {
      let name = slot.object.get_str("name").map(str::to_string);
      if let Some(name) = name {
        self.unregister_rule(&name, id);
      }
    }
  }

  pub fn get(&self, id: ObjectId) -> &Object {
    &self.slots[id.0].object
  }

  pub fn get_mut(&mut self, id: ObjectId) -> &mut Object {
    &mut self.slots[id.0].object
  }

  pub fn is_live(&self, id: ObjectId) -> bool {
    !self.slots[id.0].retired
  }

  /// Live objects in declaration order.
  pub fn live(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
    self
      .slots
      .iter()
      .enumerate()
      .filter(|(_, slot)| !slot.retired)
      .map(|(i, slot)| (ObjectId(i), &slot.object))
  }

  pub fn len(&self) -> usize {
    self.slots.iter().filter(|slot| !slot.retired).count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Resolve a rule reference against the index as it stands right now.
  pub fn lookup_rule(&self, name: &str) -> Option<&Object> {
    self.rules.get(name).map(|&id| self.get(id))
  }

  /// Expand an object across the cartesian product of axis assignments.
  ///
  /// One clone per combination is appended to the arena (at the end, not at
  /// the original's position), then the original is retired. Returns the
  /// clone ids in combination order: axes in name order, values in list
  /// order, later axes varying fastest. An empty value list for any axis
  /// yields zero clones - the original is still retired.
  pub fn for_each(&mut self, id: ObjectId, axes: &BTreeMap<String, Vec<String>>) -> Result<Vec<ObjectId>, FormatError> {
    let mut clones = Vec::new();
    for combination in combinations(axes) {
      clones.push(self.get(id).expand(combination)?);
    }

    debug!(clones = clones.len(), axes = axes.len(), "expanded object");

    let ids = clones.into_iter().map(|clone| self.insert(clone)).collect();
    self.retire(id);
    Ok(ids)
  }
}

/// Cartesian product of axis assignments, as one binding scope per
/// combination. No axes at all yields a single empty scope.
fn combinations(axes: &BTreeMap<String, Vec<String>>) -> Vec<Scope> {
  let mut combos = vec![Scope::new()];
  for (axis, values) in axes {
    let mut next = Vec::with_capacity(combos.len() * values.len());
    for base in &combos {
      for value in values {
        let mut scope = base.clone();
        scope.insert(axis.clone(), value.clone());
        next.push(scope);
      }
    }
    combos = next;
  }
  combos
}

#[cfg(test)]
mod tests {
  use super::*;

  fn rule(name: &str) -> Object {
    let mut o = Object::new(ObjectKind::Rule);
    o.set("name", name.into()).unwrap();
    o.set("command", "true".into()).unwrap();
    o
  }

  fn axes(pairs: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    pairs
      .iter()
      .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
      .collect()
  }

  mod arena {
    use super::*;

    #[test]
    fn iteration_is_declaration_order() {
      let mut ctx = Context::new();
      let a = ctx.insert(rule("a"));
      let b = ctx.insert(rule("b"));
      let order: Vec<ObjectId> = ctx.live().map(|(id, _)| id).collect();
      assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn retired_objects_disappear_from_iteration_but_stay_addressable() {
      let mut ctx = Context::new();
      let a = ctx.insert(rule("a"));
      let b = ctx.insert(rule("b"));
      ctx.retire(a);

      assert_eq!(ctx.len(), 1);
      assert!(!ctx.is_live(a));
      assert!(ctx.is_live(b));
      assert_eq!(ctx.get(a).get_str("name"), Some("a"));
    }
  }

  mod rule_index {
    use super::*;

    #[test]
    fn lookup_finds_registered_rule() {
      let mut ctx = Context::new();
      ctx.insert(rule("cc"));
      assert!(ctx.lookup_rule("cc").is_some());
      assert!(ctx.lookup_rule("link").is_none());
    }

    #[test]
    fn redeclaration_wins_for_later_lookups() {
      let mut ctx = Context::new();
      ctx.insert(rule("cc"));
      let mut second = rule("cc");
      second.set("command", "clang $in".into()).unwrap();
      ctx.insert(second);

      assert_eq!(ctx.lookup_rule("cc").unwrap().get_str("command"), Some("clang $in"));
      assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn retiring_a_shadowed_rule_keeps_the_shadower() {
      let mut ctx = Context::new();
      let first = ctx.insert(rule("cc"));
      let mut second = rule("cc");
      second.set("command", "clang $in".into()).unwrap();
      ctx.insert(second);

      ctx.retire(first);
      assert_eq!(ctx.lookup_rule("cc").unwrap().get_str("command"), Some("clang $in"));
    }

    #[test]
    fn retiring_the_current_rule_unregisters_it() {
      let mut ctx = Context::new();
      let id = ctx.insert(rule("cc"));
      ctx.retire(id);
      assert!(ctx.lookup_rule("cc").is_none());
    }
  }

  mod for_each {
    use super::*;

    #[test]
    fn clones_resolve_templates_and_original_is_removed() {
      let mut ctx = Context::new();
      let mut o = Object::new(ObjectKind::Build);
      o.set("out", "app_{arch}.nexe".into()).unwrap();
      let id = ctx.insert(o);

      let ids = ctx.for_each(id, &axes(&[("arch", &["32", "64"])])).unwrap();

      assert_eq!(ids.len(), 2);
      assert_eq!(ctx.get(ids[0]).get_str("out"), Some("app_32.nexe"));
      assert_eq!(ctx.get(ids[1]).get_str("out"), Some("app_64.nexe"));
      assert!(!ctx.is_live(id));
      assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn two_axes_produce_the_full_cross_product() {
      let mut ctx = Context::new();
      let mut o = Object::new(ObjectKind::Build);
      o.set("out", "{a}-{b}".into()).unwrap();
      let id = ctx.insert(o);

      let ids = ctx
        .for_each(id, &axes(&[("a", &["x", "y"]), ("b", &["1", "2"])]))
        .unwrap();

      let outs: Vec<&str> = ids.iter().map(|&id| ctx.get(id).get_str("out").unwrap()).collect();
      assert_eq!(outs, vec!["x-1", "x-2", "y-1", "y-2"]);
    }

    #[test]
    fn empty_axis_yields_no_clones_and_still_removes_the_original() {
      let mut ctx = Context::new();
      let id = ctx.insert(Object::new(ObjectKind::Build));

      let ids = ctx.for_each(id, &axes(&[("arch", &[])])).unwrap();

      assert!(ids.is_empty());
      assert!(!ctx.is_live(id));
      assert!(ctx.is_empty());
    }

    #[test]
    fn expanding_a_rule_reregisters_the_clone() {
      let mut ctx = Context::new();
      let mut o = rule("cc_{arch}");
      o.set("command", "{arch}-gcc $in".into()).unwrap();
      let id = ctx.insert(o);

      ctx.for_each(id, &axes(&[("arch", &["i686", "x86_64"])])).unwrap();

      assert!(ctx.lookup_rule("cc_{arch}").is_none());
      assert_eq!(ctx.lookup_rule("cc_i686").unwrap().get_str("command"), Some("i686-gcc $in"));
      assert_eq!(
        ctx.lookup_rule("cc_x86_64").unwrap().get_str("command"),
        Some("x86_64-gcc $in")
      );
    }

    #[test]
    fn clones_are_appended_after_existing_objects() {
      let mut ctx = Context::new();
      let first = ctx.insert(Object::new(ObjectKind::Variable));
      let mut o = Object::new(ObjectKind::Build);
      o.set("out", "{arch}".into()).unwrap();
      let id = ctx.insert(o);
      let last = ctx.insert(Object::new(ObjectKind::Variable));

      let ids = ctx.for_each(id, &axes(&[("arch", &["32"])])).unwrap();

      let order: Vec<ObjectId> = ctx.live().map(|(i, _)| i).collect();
      assert_eq!(order, vec![first, last, ids[0]]);
    }
  }
}
