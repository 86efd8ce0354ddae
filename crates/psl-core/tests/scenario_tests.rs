#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{run, tree};
use psl_core::{Pattern, PatternBuilder, Scalar, TypeOptions};
use serde_json::json;

/// `Foo(.x=1) => #h;`
fn foo_x_is_one(options: TypeOptions) -> Pattern {
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    let x = b.attr(Some("x"), one).unwrap();
    let foo = b.type_match("Foo", Some(vec![x]), None, options).unwrap();
    let hooked = b.hook("h", foo).unwrap();
    b.finish(hooked).unwrap()
}

/// `[0: 1, 1: 2] => #h;`
fn list_one_two(strict: bool) -> Pattern {
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    let two = b.value(2);
    let i0 = b.indice(Some(0), one).unwrap();
    let i1 = b.indice(Some(1), two).unwrap();
    let list = b.list(vec![i0, i1], strict).unwrap();
    let hooked = b.hook("h", list).unwrap();
    b.finish(hooked).unwrap()
}

#[test]
fn test_scenario_a_strict_type_fires_once() {
    // GIVEN Foo(.x=1) => #h;
    let pattern = foo_x_is_one(TypeOptions::default());

    // WHEN walking Foo(x=1)
    let subject = tree(json!({"$type": "Foo", "x": 1}));
    let hits = run(&pattern, &subject);

    // THEN the hook fires exactly once, on the Foo node
    assert_eq!(hits.len(), 1);
    assert_eq!(Some(hits[0].node), subject.root());
}

#[test]
fn test_scenario_a_extra_attribute_rejected() {
    let pattern = foo_x_is_one(TypeOptions::default());
    let hits = run(&pattern, &tree(json!({"$type": "Foo", "x": 1, "y": 2})));
    assert!(hits.is_empty());
}

#[test]
fn test_lax_type_accepts_extra_attributes() {
    let pattern = foo_x_is_one(TypeOptions::lax());
    let hits = run(&pattern, &tree(json!({"$type": "Foo", "x": 1, "y": 2})));
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_attribute_value_mismatch() {
    let pattern = foo_x_is_one(TypeOptions::default());
    assert!(run(&pattern, &tree(json!({"$type": "Foo", "x": 2}))).is_empty());
    assert!(run(&pattern, &tree(json!({"$type": "Bar", "x": 1}))).is_empty());
}

#[test]
fn test_other_attribute_value_not_borrowed() {
    // x does not match, y does: y's value must not be reported as x
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    let y = b.attr(Some("y"), one).unwrap();
    let foo = b.type_match("Foo", Some(vec![y]), None, TypeOptions::lax()).unwrap();
    let hooked = b.hook("h", foo).unwrap();
    let pattern = b.finish(hooked).unwrap();

    assert!(run(&pattern, &tree(json!({"$type": "Foo", "a": 1, "y": 2}))).is_empty());
    assert_eq!(run(&pattern, &tree(json!({"$type": "Foo", "a": 2, "y": 1}))).len(), 1);
}

#[test]
fn test_scenario_b_ancestor_exact_depth() {
    // GIVEN A / 2 B => #h;
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let bb = b.ty("B").unwrap();
    let anc = b.ancestor(a, bb, 2, false).unwrap();
    let hooked = b.hook("h", anc).unwrap();
    let pattern = b.finish(hooked).unwrap();

    // root -> A -> mid -> B matches
    let deep = tree(json!({
        "$type": "Root",
        "a": {"$type": "A", "m": {"$type": "Mid", "b": {"$type": "B"}}}
    }));
    assert_eq!(run(&pattern, &deep).len(), 1);

    // root -> A -> B does not
    let shallow = tree(json!({
        "$type": "Root",
        "a": {"$type": "A", "b": {"$type": "B"}}
    }));
    assert!(run(&pattern, &shallow).is_empty());
}

#[test]
fn test_ancestor_minimum_depth() {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let bb = b.ty("B").unwrap();
    let anc = b.ancestor(a, bb, 1, true).unwrap();
    let hooked = b.hook("h", anc).unwrap();
    let pattern = b.finish(hooked).unwrap();

    let deep = tree(json!({
        "$type": "A",
        "m": {"$type": "Mid", "b": {"$type": "B"}}
    }));
    assert_eq!(run(&pattern, &deep).len(), 1);
}

#[test]
fn test_scenario_c_strict_list() {
    let pattern = list_one_two(true);
    assert_eq!(run(&pattern, &tree(json!([1, 2]))).len(), 1);
    assert!(run(&pattern, &tree(json!([1, 2, 3]))).is_empty());
    assert!(run(&pattern, &tree(json!([2, 1]))).is_empty());
}

#[test]
fn test_lax_list_ignores_length() {
    let pattern = list_one_two(false);
    assert_eq!(run(&pattern, &tree(json!([1, 2, 3]))).len(), 1);
    assert!(run(&pattern, &tree(json!([1]))).is_empty());
}

#[test]
fn test_literal_collision_by_canonical_string() {
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    let hooked = b.hook("h", one).unwrap();
    let pattern = b.finish(hooked).unwrap();

    assert_eq!(run(&pattern, &tree(json!(["1"]))).len(), 1);
    assert_eq!(run(&pattern, &tree(json!([1]))).len(), 1);
    assert!(run(&pattern, &tree(json!([1.5]))).is_empty());
    assert_eq!(Scalar::from(1).canonical(), Scalar::from("1").canonical());
}

#[test]
fn test_every_occurrence_reported() {
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    let x = b.attr(Some("x"), one).unwrap();
    let foo = b.type_match("Foo", Some(vec![x]), None, TypeOptions::default()).unwrap();
    let hooked = b.hook("h", foo).unwrap();
    let pattern = b.finish(hooked).unwrap();

    let subject = tree(json!([
        {"$type": "Foo", "x": 1},
        {"$type": "Bar", "inner": {"$type": "Foo", "x": 1}},
        {"$type": "Foo", "x": 3}
    ]));
    assert_eq!(run(&pattern, &subject).len(), 2);
}

#[test]
fn test_dict_keys() {
    let mut b = PatternBuilder::new();
    let v = b.value("on");
    let k = b.key(Some("mode"), v).unwrap();
    let dict = b.dict(vec![k], false).unwrap();
    let hooked = b.hook("h", dict).unwrap();
    let pattern = b.finish(hooked).unwrap();

    assert_eq!(run(&pattern, &tree(json!({"mode": "on", "x": 1}))).len(), 1);
    assert!(run(&pattern, &tree(json!({"mode": "off"}))).is_empty());
}

#[test]
fn test_type_with_list_subs() {
    // Row([0: *, ...]) matches a typed node carrying indexed children
    let mut b = PatternBuilder::new();
    let any = b.any_value();
    let first = b.indice(Some(0), any).unwrap();
    let subs = b.list(vec![first], false).unwrap();
    let row = b.type_match("Row", None, Some(subs), TypeOptions::default()).unwrap();
    let hooked = b.hook("h", row).unwrap();
    let pattern = b.finish(hooked).unwrap();

    let mut subject = psl_core::Tree::new();
    let row_node = subject.add_node("Row");
    let cell = subject.add_scalar(7);
    subject.push_indice(row_node, cell).unwrap();
    subject.set_root(row_node).unwrap();
    assert_eq!(run(&pattern, &subject).len(), 1);

    let mut empty = psl_core::Tree::new();
    let bare = empty.add_node("Row");
    empty.set_root(bare).unwrap();
    assert!(run(&pattern, &empty).is_empty());
}
