//! Pattern → stack-action compiler
//!
//! Each pattern variant compiles into one or more basic blocks. Children of
//! unordered containers (type attributes, list indices, dict keys) compile
//! into independent blocks that each end with `set_event`; the container's
//! own block synchronizes on all of those events before its type check
//! fires.

pub mod action;
pub mod context;

use std::collections::BTreeSet;

use crate::errors::{PslError, Result};
use crate::pattern::{Pattern, PatternId, PatternKind};
use crate::{log_op_end, log_op_error, log_op_start};

pub use action::{BasicBlock, DepthReg, EventId, StackAction};
pub use context::CompileContext;

type Blocks = Vec<Vec<StackAction>>;

/// Output of compiling one pattern
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPattern {
    /// PSL text of the pattern
    pub label: String,
    pub blocks: Vec<BasicBlock>,
    pub context: CompileContext,
    pub hooks: BTreeSet<String>,
    pub named_events: BTreeSet<String>,
}

/// Compile a pattern into basic blocks
///
/// # Errors
///
/// Returns `UnknownPatternNode` if the arena is inconsistent, or `Internal`
/// if a sub-pattern produced no instructions.
pub fn compile(pattern: &Pattern) -> Result<CompiledPattern> {
    let statements = pattern.statements();
    log_op_start!("compile_pattern", statement_count = statements.len());
    let start = std::time::Instant::now();

    let result = compile_impl(pattern, &statements).map_err(|e| {
        log_op_error!(
            "compile_pattern",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64
        );
        e
    })?;

    log_op_end!(
        "compile_pattern",
        duration_ms = start.elapsed().as_millis() as u64,
        block_count = result.blocks.len()
    );

    Ok(result)
}

fn compile_impl(pattern: &Pattern, statements: &[PatternId]) -> Result<CompiledPattern> {
    let mut compiler = Compiler {
        pattern,
        cx: CompileContext::new(),
    };

    let mut blocks = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        for actions in compiler.node(*statement, None)? {
            tracing::trace!(statement = index, block = %render(&actions), "compiled block");
            blocks.push(BasicBlock {
                statement: index,
                actions,
            });
        }
    }

    Ok(CompiledPattern {
        label: pattern.to_string(),
        blocks,
        context: compiler.cx,
        hooks: pattern.hook_names().into_iter().map(str::to_string).collect(),
        named_events: pattern
            .named_events()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

fn render(actions: &[StackAction]) -> String {
    actions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

struct Compiler<'p> {
    pattern: &'p Pattern,
    cx: CompileContext,
}

/// Last block of a compiled sub-pattern
fn tail(blocks: &mut Blocks) -> Result<&mut Vec<StackAction>> {
    blocks.last_mut().ok_or_else(|| PslError::Internal {
        message: "sub-pattern compiled to no blocks".to_string(),
    })
}

impl Compiler<'_> {
    /// Compile `id`; `ancestry` is the depth register an enclosing type
    /// checks its attributes against
    fn node(&mut self, id: PatternId, ancestry: Option<DepthReg>) -> Result<Blocks> {
        let kind = self.pattern.kind(id)?;
        match kind {
            PatternKind::Value(literal) => Ok(vec![vec![
                StackAction::Value(literal.as_ref().map(|l| l.canonical())),
                StackAction::Type(None),
                StackAction::EndNode,
            ]]),

            PatternKind::Type {
                name,
                attrs,
                subs,
                strict,
                kind_of,
            } => {
                let type_check = if *kind_of {
                    StackAction::SubType(name.clone())
                } else {
                    StackAction::Type(Some(name.clone()))
                };
                let mut blocks = Vec::new();
                let mut events = Vec::new();
                let mut sync = vec![StackAction::Value(None), type_check, StackAction::EndNode];

                if let Some(subs) = subs {
                    let (items, end, sub_strict) = match self.pattern.kind(*subs)? {
                        PatternKind::List { items, strict } => {
                            (items, StackAction::EndIndices, *strict)
                        }
                        PatternKind::Dict { items, strict } => {
                            (items, StackAction::EndKeys, *strict)
                        }
                        other => {
                            return Err(PslError::UnexpectedPattern {
                                context: "Type subs".to_string(),
                                expected: "List or Dict".to_string(),
                                found: other.variant_name().to_string(),
                            })
                        }
                    };
                    self.children(items, &mut blocks, &mut events)?;
                    sync.push(end);
                    if sub_strict {
                        sync.push(StackAction::CheckLen(items.len()));
                    }
                }

                let mut regs = Vec::new();
                if let Some(attrs) = attrs {
                    for attr in attrs {
                        let label = self.pattern.display(*attr).to_string();
                        let reg = self.cx.fresh_depth_reg(label.clone());
                        let mut child = self.node(*attr, Some(reg))?;
                        let event = self.cx.fresh_event(label);
                        tail(&mut child)?.push(StackAction::SetEvent(event));
                        events.push(event);
                        regs.push(reg);
                        blocks.extend(child);
                    }
                    if *strict {
                        sync.push(StackAction::EndAttrs);
                        sync.push(StackAction::CheckAttrLen(attrs.len()));
                    }
                }

                for reg in regs {
                    sync.push(StackAction::CheckAncestorDepth {
                        reg,
                        depth: 1,
                        is_min: false,
                    });
                }
                if !events.is_empty() {
                    sync.push(StackAction::CheckCleanEventAnd(events));
                }
                blocks.push(sync);
                Ok(blocks)
            }

            PatternKind::Attr { name, inner } => {
                let mut blocks = self.node(*inner, None)?;
                let last = tail(&mut blocks)?;
                if let Some(reg) = ancestry {
                    last.push(StackAction::StoreAncestorDepth(reg));
                }
                last.push(StackAction::Attr(name.clone()));
                Ok(blocks)
            }

            PatternKind::Indice { index, inner } => {
                let mut blocks = self.node(*inner, None)?;
                tail(&mut blocks)?.push(StackAction::Indice(*index));
                Ok(blocks)
            }

            PatternKind::Key { key, inner } => {
                let mut blocks = self.node(*inner, None)?;
                tail(&mut blocks)?.push(StackAction::Key(key.clone()));
                Ok(blocks)
            }

            PatternKind::List { items, strict } | PatternKind::Dict { items, strict } => {
                let is_list = matches!(kind, PatternKind::List { .. });
                let mut blocks = Vec::new();
                let mut events = Vec::new();
                self.children(items, &mut blocks, &mut events)?;

                let mut sync = vec![
                    StackAction::Value(None),
                    StackAction::Type(None),
                    StackAction::EndNode,
                    if is_list {
                        StackAction::EndIndices
                    } else {
                        StackAction::EndKeys
                    },
                ];
                if *strict {
                    sync.push(StackAction::CheckLen(items.len()));
                }
                if !events.is_empty() {
                    sync.push(StackAction::CheckCleanEventAnd(events));
                }
                blocks.push(sync);
                Ok(blocks)
            }

            PatternKind::Ancestor {
                left,
                right,
                depth,
                is_min,
            } => {
                let mut blocks = self.node(*right, None)?;
                let reg = self
                    .cx
                    .fresh_depth_reg(self.pattern.display(*right).to_string());
                tail(&mut blocks)?.push(StackAction::StoreAncestorDepth(reg));

                let mut ancestor = self.node(*left, None)?;
                tail(&mut ancestor)?.push(StackAction::CheckAncestorDepth {
                    reg,
                    depth: *depth,
                    is_min: *is_min,
                });
                blocks.extend(ancestor);
                Ok(blocks)
            }

            PatternKind::Sibling { items } => {
                let mut blocks = Vec::new();
                let mut regs = Vec::new();
                for item in items {
                    let mut child = self.node(*item, None)?;
                    let reg = self
                        .cx
                        .fresh_depth_reg(self.pattern.display(*item).to_string());
                    tail(&mut child)?.push(StackAction::StoreSiblingDepth(reg));
                    regs.push(reg);
                    blocks.extend(child);
                }
                tail(&mut blocks)?.push(StackAction::CheckSiblingDepth(regs));
                Ok(blocks)
            }

            PatternKind::Capture { name, inner, pair } => {
                let mut blocks = self.node(*inner, None)?;
                let last = tail(&mut blocks)?;
                let pos = last
                    .iter()
                    .rposition(StackAction::is_discriminant)
                    .ok_or_else(|| PslError::Internal {
                        message: format!("capture {} has nothing to bind", name),
                    })?;
                if *pair {
                    last.insert(pos, StackAction::CapturePairSecond(name.clone()));
                    last.push(StackAction::CapturePairFirst(name.clone()));
                } else {
                    last.insert(pos, StackAction::Capture(name.clone()));
                }
                Ok(blocks)
            }

            PatternKind::NamedEvent { name, inner } => {
                let mut blocks = self.node(*inner, None)?;
                tail(&mut blocks)?.push(StackAction::SetNamedEvent(name.clone()));
                Ok(blocks)
            }

            PatternKind::Precondition { inner, expr, clean } => {
                let mut blocks = self.node(*inner, None)?;
                let last = tail(&mut blocks)?;
                last.push(StackAction::CheckNamedEvent(expr.clone()));
                if *clean {
                    last.push(StackAction::PostponeCleanNamedEvent);
                }
                Ok(blocks)
            }

            PatternKind::Hook { name, inner } => {
                let mut blocks = self.node(*inner, None)?;
                tail(&mut blocks)?.push(StackAction::Hook(name.clone()));
                Ok(blocks)
            }

            PatternKind::Block { statements } => {
                let mut blocks = Vec::new();
                for statement in statements {
                    blocks.extend(self.node(*statement, None)?);
                }
                Ok(blocks)
            }
        }
    }

    /// Compile container items, each completing with its own event
    fn children(
        &mut self,
        items: &[PatternId],
        blocks: &mut Blocks,
        events: &mut Vec<EventId>,
    ) -> Result<()> {
        for item in items {
            let mut child = self.node(*item, None)?;
            let event = self
                .cx
                .fresh_event(self.pattern.display(*item).to_string());
            tail(&mut child)?.push(StackAction::SetEvent(event));
            events.push(event);
            blocks.extend(child);
        }
        Ok(())
    }
}
