#![allow(clippy::unwrap_used, clippy::expect_used)]

use psl_core::errors::{ExError, ExErrorKind, PslError};
use psl_core::{
    assemble, HookRegistry, LivingContext, PatternBuilder, StateId, StateRegister, Tree,
};
use serde_json::json;

#[test]
fn test_invalid_ancestor_depth_code() {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let bb = b.ty("B").unwrap();
    let err = b.ancestor(a, bb, 0, false).unwrap_err();

    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::InvalidAncestorDepth);
    assert_eq!(ex.code(), "ERR_INVALID_ANCESTOR_DEPTH");
}

#[test]
fn test_unknown_hook_code_names_hook() {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let hooked = b.hook("missing", a).unwrap();
    let pattern = b.finish(hooked).unwrap();

    let hooks: HookRegistry<()> = HookRegistry::new();
    let err = StateRegister::compile(&pattern, &hooks).unwrap_err();

    let ex: ExError = err.into();
    assert_eq!(ex.code(), "ERR_UNKNOWN_HOOK");
    assert_eq!(ex.entity_id(), Some("missing"));
}

#[test]
fn test_living_context_checks_hooks() {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let hooked = b.hook("h", a).unwrap();
    let pattern = b.finish(hooked).unwrap();

    let mut full: HookRegistry<()> = HookRegistry::new();
    full.register("h", |_, _| {});
    let register = StateRegister::compile(&pattern, &full).unwrap();

    let empty: HookRegistry<()> = HookRegistry::new();
    let err = LivingContext::with_registers([&register], &empty, ()).unwrap_err();
    assert_eq!(err, PslError::UnknownHook { hook: "h".into() });
}

#[test]
fn test_unknown_directive_code() {
    let err = assemble(&json!({"type": "Foo", "directives": ["fast"]})).unwrap_err();
    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::UnknownDirective);
    assert_eq!(ex.entity_id(), Some("fast"));
}

#[test]
fn test_literal_where_expression_code() {
    let err = assemble(&json!({"hook": "h", "match": "Foo"})).unwrap_err();
    let ex: ExError = err.into();
    assert_eq!(ex.code(), "ERR_LITERAL_WHERE_EXPRESSION");
}

#[test]
fn test_already_attached_code() {
    let mut b = PatternBuilder::new();
    let one = b.value(1);
    b.attr(Some("x"), one).unwrap();
    let err = b.attr(Some("y"), one).unwrap_err();

    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::AlreadyAttached);
}

#[test]
fn test_unknown_state_is_not_found() {
    let mut b = PatternBuilder::new();
    let a = b.ty("A").unwrap();
    let pattern = b.finish(a).unwrap();
    let hooks: HookRegistry<()> = HookRegistry::new();
    let register = StateRegister::compile(&pattern, &hooks).unwrap();

    let err = register.get_state(StateId::from_raw(1_000)).unwrap_err();
    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::NotFound);
    assert_eq!(ex.entity_id(), Some("1000"));
}

#[test]
fn test_unknown_subject_node_is_not_found() {
    let mut tree = Tree::new();
    let err = tree.set_root(psl_core::NodeId::from_raw(3)).unwrap_err();
    let ex: ExError = err.into();
    assert_eq!(ex.code(), "ERR_NOT_FOUND");
}
