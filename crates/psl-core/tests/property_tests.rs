#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{run, tree};
use proptest::prelude::*;
use psl_core::{EventExpr, Pattern, PatternBuilder};
use serde_json::{json, Value};

fn literal_hook(n: i64) -> Pattern {
    let mut b = PatternBuilder::new();
    let v = b.value(n);
    let hooked = b.hook("h", v).unwrap();
    b.finish(hooked).unwrap()
}

fn list_of(values: &[i64], strict: bool) -> Pattern {
    let mut b = PatternBuilder::new();
    let mut items = Vec::new();
    for (i, v) in values.iter().enumerate() {
        let lit = b.value(*v);
        items.push(b.indice(Some(i), lit).unwrap());
    }
    let list = b.list(items, strict).unwrap();
    let hooked = b.hook("h", list).unwrap();
    b.finish(hooked).unwrap()
}

fn ancestor_of(depth: usize, is_min: bool) -> Pattern {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let bb = b.ty("B").unwrap();
    let anc = b.ancestor(a, bb, depth, is_min).unwrap();
    let hooked = b.hook("h", anc).unwrap();
    b.finish(hooked).unwrap()
}

/// A node with `gap - 1` intermediate nodes above a B node
fn chain(gap: usize) -> Value {
    let mut node = json!({"$type": "B"});
    for _ in 1..gap {
        node = json!({"$type": "Mid", "next": node});
    }
    json!({"$type": "A", "next": node})
}

fn events_then_z(expr: EventExpr, a: bool, b_present: bool) -> usize {
    let mut b = PatternBuilder::new();
    let ta = b.ty("A").unwrap();
    let ea = b.named_event("a", ta).unwrap();
    let tb = b.ty("B").unwrap();
    let eb = b.named_event("b", tb).unwrap();
    let z = b.ty("Z").unwrap();
    let guarded = b.precondition(z, expr, false).unwrap();
    let hooked = b.hook("h", guarded).unwrap();
    let pattern = b.block(vec![ea, eb, hooked]).unwrap();

    let mut doc = serde_json::Map::new();
    doc.insert("$type".into(), json!("Root"));
    if a {
        doc.insert("a".into(), json!({"$type": "A"}));
    }
    if b_present {
        doc.insert("b".into(), json!({"$type": "B"}));
    }
    doc.insert("z".into(), json!({"$type": "Z"}));
    run(&pattern, &tree(Value::Object(doc))).len()
}

proptest! {
    #[test]
    fn prop_literal_matches_by_canonical_string(n in -1_000_000_000i64..1_000_000_000) {
        let pattern = literal_hook(n);
        prop_assert_eq!(run(&pattern, &tree(json!([n]))).len(), 1);
        prop_assert_eq!(run(&pattern, &tree(json!([n.to_string()]))).len(), 1);
        prop_assert!(run(&pattern, &tree(json!([n + 1]))).is_empty());
    }

    #[test]
    fn prop_strict_list_rejects_extra_items(
        values in prop::collection::vec(0i64..10, 1..5),
        extra in 0i64..10,
    ) {
        let mut longer = values.clone();
        longer.push(extra);

        let strict = list_of(&values, true);
        prop_assert_eq!(run(&strict, &tree(json!(values))).len(), 1);
        prop_assert!(run(&strict, &tree(json!(longer))).is_empty());

        let lax = list_of(&values, false);
        prop_assert_eq!(run(&lax, &tree(json!(longer))).len(), 1);
    }

    #[test]
    fn prop_ancestor_depth(depth in 1usize..4, gap in 1usize..6) {
        let subject = tree(chain(gap));
        let exact = run(&ancestor_of(depth, false), &subject).len();
        let at_least = run(&ancestor_of(depth, true), &subject).len();
        prop_assert_eq!(exact, usize::from(gap == depth));
        prop_assert_eq!(at_least, usize::from(gap >= depth));
    }

    #[test]
    fn prop_event_combinators(a in any::<bool>(), b in any::<bool>()) {
        let both = || [EventExpr::named("a"), EventExpr::named("b")];
        prop_assert_eq!(events_then_z(EventExpr::and(both()), a, b), usize::from(a && b));
        prop_assert_eq!(events_then_z(EventExpr::or(both()), a, b), usize::from(a || b));
        prop_assert_eq!(events_then_z(EventExpr::xor(both()), a, b), usize::from(a ^ b));
    }
}
