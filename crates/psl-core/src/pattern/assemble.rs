//! JSON pattern documents
//!
//! Each pattern is an object keyed by its shape (`{"type": "Foo", ...}`,
//! `{"attr": "x", "match": ...}`); a `{"block": [...]}` root holds several
//! statements. Optional `directives` adjust the shape they sit on.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::errors::{PslError, Result};
use crate::{log_op_end, log_op_error, log_op_start};

use super::{EventExpr, Pattern, PatternBuilder, PatternId, Scalar, TypeOptions};

/// Match subtypes (type patterns)
pub const DIRECTIVE_KIND_OF: &str = "kind_of";
/// Do not require the exact child count (type, list and dict patterns)
pub const DIRECTIVE_LAX: &str = "lax";
/// Leave the events that satisfied a precondition raised
pub const DIRECTIVE_KEEP_EVENTS: &str = "keep_events";

const SHAPES: &[&str] = &[
    "value", "type", "attr", "indice", "key", "list", "dict", "ancestor", "sibling", "capture",
    "event", "precond", "hook", "block",
];

/// Assemble a pattern from a JSON document
///
/// # Errors
///
/// Returns `LiteralWhereExpression` when a scalar stands where a pattern is
/// required, `UnknownDirective` for unrecognised directives,
/// `MalformedDocument` for unrecognised shapes, and any error raised by
/// [`PatternBuilder`] while the pattern is put together.
pub fn assemble(document: &Value) -> Result<Pattern> {
    log_op_start!("assemble_pattern");
    let start = std::time::Instant::now();

    let pattern = assemble_impl(document).map_err(|e| {
        log_op_error!(
            "assemble_pattern",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "assemble_pattern",
        duration_ms = start.elapsed().as_millis() as u64,
        node_count = pattern.len()
    );
    Ok(pattern)
}

/// Parse and assemble a pattern from JSON text
///
/// # Errors
///
/// Returns `Serialization` if `text` is not JSON, otherwise as [`assemble`].
pub fn assemble_str(text: &str) -> Result<Pattern> {
    let document: Value = serde_json::from_str(text)?;
    assemble(&document)
}

fn assemble_impl(document: &Value) -> Result<Pattern> {
    let mut assembler = Assembler {
        builder: PatternBuilder::new(),
    };

    if let Some(statements) = document.as_object().and_then(|m| m.get("block")) {
        let statements = array(statements, "block")?;
        let mut ids = Vec::with_capacity(statements.len());
        for statement in statements {
            ids.push(assembler.pattern(statement, "block")?);
        }
        return assembler.builder.block(ids);
    }

    let root = assembler.pattern(document, "pattern")?;
    assembler.builder.finish(root)
}

struct Assembler {
    builder: PatternBuilder,
}

impl Assembler {
    fn pattern(&mut self, document: &Value, context: &str) -> Result<PatternId> {
        let members = match document {
            Value::Object(members) => members,
            other => {
                return Err(match Scalar::from_json(other) {
                    Some(literal) => PslError::LiteralWhereExpression {
                        context: context.to_string(),
                        literal: literal.to_string(),
                    },
                    None => PslError::MalformedDocument {
                        reason: format!("{} expects a pattern object, found {}", context, other),
                    },
                })
            }
        };

        let shape = SHAPES
            .iter()
            .copied()
            .find(|s| members.contains_key(*s))
            .ok_or_else(|| PslError::MalformedDocument {
                reason: format!("{}: unknown pattern shape {}", context, document),
            })?;

        match shape {
            "value" => match field(members, "value")? {
                Value::Null => Ok(self.builder.any_value()),
                literal => {
                    let literal =
                        Scalar::from_json(literal).ok_or_else(|| PslError::MalformedDocument {
                            reason: format!("value expects a scalar or null, found {}", literal),
                        })?;
                    Ok(self.builder.value(literal))
                }
            },

            "type" => {
                let directives = directives(members, &[DIRECTIVE_KIND_OF, DIRECTIVE_LAX])?;
                let name = string(field(members, "type")?, "type")?;
                let attrs = match members.get("attrs") {
                    Some(attrs) => Some(self.patterns(attrs, "type attrs")?),
                    None => None,
                };
                let subs = match members.get("subs") {
                    Some(subs) => Some(self.pattern(subs, "type subs")?),
                    None => None,
                };
                let mut options = TypeOptions {
                    strict: !directives.contains(DIRECTIVE_LAX),
                    kind_of: false,
                };
                if directives.contains(DIRECTIVE_KIND_OF) {
                    options = options.with_kind_of();
                }
                self.builder.type_match(name, attrs, subs, options)
            }

            "attr" => {
                let name = optional_string(field(members, "attr")?, "attr")?;
                let inner = self.inner(members, "attr")?;
                self.builder.attr(name, inner)
            }

            "indice" => {
                let index = match field(members, "indice")? {
                    Value::Null => None,
                    other => Some(index(other)?),
                };
                let inner = self.inner(members, "indice")?;
                self.builder.indice(index, inner)
            }

            "key" => {
                let key = optional_string(field(members, "key")?, "key")?;
                let inner = self.inner(members, "key")?;
                self.builder.key(key, inner)
            }

            "list" | "dict" => {
                let directives = directives(members, &[DIRECTIVE_LAX])?;
                let items = self.patterns(field(members, shape)?, shape)?;
                let strict = !directives.contains(DIRECTIVE_LAX);
                if shape == "list" {
                    self.builder.list(items, strict)
                } else {
                    self.builder.dict(items, strict)
                }
            }

            "ancestor" => {
                let sides = array(field(members, "ancestor")?, "ancestor")?;
                let [left, right] = sides else {
                    return Err(PslError::MalformedDocument {
                        reason: format!("ancestor expects [left, right], found {} item(s)", sides.len()),
                    });
                };
                let depth = match members.get("depth") {
                    Some(depth) => depth_of(depth)?,
                    None => 1,
                };
                let is_min = match members.get("min") {
                    Some(min) => min.as_bool().ok_or_else(|| PslError::MalformedDocument {
                        reason: format!("ancestor min must be a boolean, found {}", min),
                    })?,
                    None => false,
                };
                let left = self.pattern(left, "ancestor")?;
                let right = self.pattern(right, "ancestor")?;
                self.builder.ancestor(left, right, depth, is_min)
            }

            "sibling" => {
                let items = self.patterns(field(members, "sibling")?, "sibling")?;
                self.builder.sibling(items)
            }

            "capture" => {
                let name = string(field(members, "capture")?, "capture")?;
                let pair = match members.get("pair") {
                    Some(pair) => pair.as_bool().ok_or_else(|| PslError::MalformedDocument {
                        reason: format!("capture pair must be a boolean, found {}", pair),
                    })?,
                    None => false,
                };
                let inner = self.inner(members, "capture")?;
                if pair {
                    self.builder.capture_pair(name, inner)
                } else {
                    self.builder.capture(name, inner)
                }
            }

            "event" => {
                let name = string(field(members, "event")?, "event")?;
                let inner = self.inner(members, "event")?;
                self.builder.named_event(name, inner)
            }

            "precond" => {
                let directives = directives(members, &[DIRECTIVE_KEEP_EVENTS])?;
                let expr = event_expr(field(members, "precond")?)?;
                let inner = self.inner(members, "precond")?;
                self.builder
                    .precondition(inner, expr, !directives.contains(DIRECTIVE_KEEP_EVENTS))
            }

            "hook" => {
                let name = string(field(members, "hook")?, "hook")?;
                let inner = self.inner(members, "hook")?;
                self.builder.hook(name, inner)
            }

            _ => Err(PslError::UnexpectedPattern {
                context: context.to_string(),
                expected: "a statement".to_string(),
                found: "Block".to_string(),
            }),
        }
    }

    fn inner(&mut self, members: &Map<String, Value>, context: &str) -> Result<PatternId> {
        self.pattern(field(members, "match")?, context)
    }

    fn patterns(&mut self, items: &Value, context: &str) -> Result<Vec<PatternId>> {
        array(items, context)?
            .iter()
            .map(|item| self.pattern(item, context))
            .collect()
    }
}

fn field<'v>(members: &'v Map<String, Value>, name: &str) -> Result<&'v Value> {
    members.get(name).ok_or_else(|| PslError::MalformedDocument {
        reason: format!("missing field '{}'", name),
    })
}

fn array<'v>(value: &'v Value, context: &str) -> Result<&'v [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| PslError::MalformedDocument {
            reason: format!("{} expects a list, found {}", context, value),
        })
}

fn string<'v>(value: &'v Value, context: &str) -> Result<&'v str> {
    value.as_str().ok_or_else(|| PslError::MalformedDocument {
        reason: format!("{} expects a string, found {}", context, value),
    })
}

fn optional_string<'v>(value: &'v Value, context: &str) -> Result<Option<&'v str>> {
    match value {
        Value::Null => Ok(None),
        other => string(other, context).map(Some),
    }
}

fn index(value: &Value) -> Result<usize> {
    value
        .as_u64()
        .map(|i| i as usize)
        .ok_or_else(|| PslError::MalformedDocument {
            reason: format!("indice expects a non-negative integer or null, found {}", value),
        })
}

fn depth_of(value: &Value) -> Result<usize> {
    match value.as_i64() {
        Some(depth) if depth < 1 => Err(PslError::InvalidAncestorDepth {
            depth: depth.max(0) as usize,
        }),
        Some(depth) => Ok(depth as usize),
        None => Err(PslError::MalformedDocument {
            reason: format!("ancestor depth must be an integer, found {}", value),
        }),
    }
}

fn directives(members: &Map<String, Value>, allowed: &[&str]) -> Result<BTreeSet<String>> {
    let Some(listed) = members.get("directives") else {
        return Ok(BTreeSet::new());
    };
    let mut out = BTreeSet::new();
    for directive in array(listed, "directives")? {
        let name = string(directive, "directives")?;
        if !allowed.contains(&name) {
            return Err(PslError::UnknownDirective {
                directive: name.to_string(),
            });
        }
        out.insert(name.to_string());
    }
    Ok(out)
}

/// Event expression: a name, or `{"and"|"or"|"xor": [...]}`, `{"not": e}`,
/// `{"paren": e}`
fn event_expr(value: &Value) -> Result<EventExpr> {
    if let Some(name) = value.as_str() {
        return Ok(EventExpr::named(name));
    }
    let malformed = || PslError::MalformedDocument {
        reason: format!("unknown event expression {}", value),
    };
    let members = value.as_object().ok_or_else(malformed)?;
    let (op, operand) = members.iter().next().ok_or_else(malformed)?;
    if members.len() != 1 {
        return Err(malformed());
    }
    let operands = || -> Result<Vec<EventExpr>> {
        array(operand, op)?.iter().map(event_expr).collect()
    };
    match op.as_str() {
        "and" => Ok(EventExpr::and(operands()?)),
        "or" => Ok(EventExpr::or(operands()?)),
        "xor" => Ok(EventExpr::xor(operands()?)),
        "not" => Ok(EventExpr::not(event_expr(operand)?)),
        "paren" => Ok(EventExpr::paren(event_expr(operand)?)),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternKind;
    use serde_json::json;

    #[test]
    fn test_assemble_type_with_attrs() {
        let pattern = assemble(&json!({
            "hook": "on_foo",
            "match": {
                "type": "Foo",
                "attrs": [{"attr": "x", "match": {"value": 1}}]
            }
        }))
        .unwrap();
        assert_eq!(pattern.to_string(), "Foo(.x=1) => #on_foo;");
    }

    #[test]
    fn test_assemble_block() {
        let pattern = assemble(&json!({
            "block": [
                {"event": "a", "match": {"type": "A"}},
                {"precond": "a", "match": {"type": "B"}}
            ]
        }))
        .unwrap();
        assert_eq!(pattern.statements().len(), 2);
    }

    #[test]
    fn test_directives_set_options() {
        let pattern = assemble(&json!({
            "type": "Foo",
            "directives": ["kind_of", "lax"]
        }))
        .unwrap();
        match pattern.kind(pattern.root()).unwrap() {
            PatternKind::Type {
                strict, kind_of, ..
            } => {
                assert!(!strict);
                assert!(kind_of);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_unknown_directive() {
        let err = assemble(&json!({"list": [], "directives": ["kind_of"]})).unwrap_err();
        assert_eq!(
            err,
            PslError::UnknownDirective {
                directive: "kind_of".into()
            }
        );
    }

    #[test]
    fn test_literal_where_pattern_required() {
        let err = assemble(&json!({"attr": "x", "match": 1})).unwrap_err();
        assert!(matches!(err, PslError::LiteralWhereExpression { .. }));
    }

    #[test]
    fn test_ancestor_depth_rejected() {
        let err = assemble(&json!({
            "ancestor": [{"type": "A"}, {"type": "B"}],
            "depth": 0
        }))
        .unwrap_err();
        assert_eq!(err, PslError::InvalidAncestorDepth { depth: 0 });
    }

    #[test]
    fn test_event_expressions() {
        let expr = event_expr(&json!({"and": ["a", {"not": "b"}]})).unwrap();
        assert_eq!(
            expr,
            EventExpr::and([EventExpr::named("a"), EventExpr::not(EventExpr::named("b"))])
        );
        assert!(event_expr(&json!({"nand": ["a"]})).is_err());
    }

    #[test]
    fn test_unknown_shape() {
        let err = assemble(&json!({"glob": "*"})).unwrap_err();
        assert!(matches!(err, PslError::MalformedDocument { .. }));
    }

    #[test]
    fn test_nested_block_rejected() {
        let err = assemble(&json!({"hook": "h", "match": {"block": []}})).unwrap_err();
        assert!(matches!(err, PslError::UnexpectedPattern { .. }));
    }
}
