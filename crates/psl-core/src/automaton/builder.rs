use std::collections::BTreeSet;

use crate::compiler::{BasicBlock, StackAction};
use crate::errors::{PslError, Result};

use super::{Discriminator, Edge, EdgeId, Effect, Guard, LenFacet, State, StateId, SyncMode, Target};

/// Wrapper applied to a step's target, innermost first
#[derive(Debug, Clone, PartialEq)]
enum Wrapper {
    NamedEvent(String),
    Hook(String),
}

/// One discriminant with everything that decorates it
#[derive(Debug, Clone, PartialEq)]
struct Step {
    on: Discriminator,
    guards: Vec<Guard>,
    effects: Vec<Effect>,
    wrappers: Vec<Wrapper>,
    clean_events: bool,
}

impl Step {
    fn new(on: Discriminator, effects: Vec<Effect>) -> Self {
        Self {
            on,
            guards: Vec::new(),
            effects,
            wrappers: Vec::new(),
            clean_events: false,
        }
    }
}

fn current<'s>(steps: &'s mut [Step], action: &StackAction) -> Result<&'s mut Step> {
    steps.last_mut().ok_or_else(|| PslError::Internal {
        message: format!("{} before any discriminant", action.opcode()),
    })
}

/// Translate one block into steps
///
/// Captures bind to the next discriminant; everything else decorates the
/// most recent one.
fn steps_of(block: &BasicBlock) -> Result<Vec<Step>> {
    let mut steps: Vec<Step> = Vec::new();
    let mut pending: Vec<Effect> = Vec::new();
    let mut facet = LenFacet::Indices;

    for action in &block.actions {
        let discriminator = match action {
            StackAction::Value(v) => Some(Discriminator::Value(v.clone())),
            StackAction::Type(t) => Some(Discriminator::Type(t.clone())),
            StackAction::SubType(t) => Some(Discriminator::SubType(t.clone())),
            StackAction::Attr(a) => Some(Discriminator::Attr(a.clone())),
            StackAction::Indice(i) => Some(Discriminator::Indice(*i)),
            StackAction::Key(k) => Some(Discriminator::Key(k.clone())),
            StackAction::CheckNamedEvent(expr) => Some(Discriminator::Event(expr.clone())),
            _ => None,
        };
        if let Some(on) = discriminator {
            steps.push(Step::new(on, std::mem::take(&mut pending)));
            continue;
        }

        match action {
            StackAction::Capture(name) => pending.push(Effect::Capture(name.clone())),
            StackAction::CapturePairSecond(name) => {
                pending.push(Effect::CapturePairSecond(name.clone()))
            }
            StackAction::CapturePairFirst(name) => current(&mut steps, action)?
                .effects
                .push(Effect::CapturePairFirst(name.clone())),
            StackAction::EndNode => {}
            StackAction::EndAttrs => facet = LenFacet::Attrs,
            StackAction::EndIndices => facet = LenFacet::Indices,
            StackAction::EndKeys => facet = LenFacet::Keys,
            StackAction::SetEvent(ev) => current(&mut steps, action)?
                .effects
                .push(Effect::Complete(*ev)),
            StackAction::CheckCleanEventAnd(events) => current(&mut steps, action)?
                .guards
                .push(Guard::Sync {
                    mode: SyncMode::All,
                    events: events.clone(),
                }),
            StackAction::CheckCleanEventOr(events) => current(&mut steps, action)?
                .guards
                .push(Guard::Sync {
                    mode: SyncMode::Any,
                    events: events.clone(),
                }),
            StackAction::CheckCleanEventXor(events) => current(&mut steps, action)?
                .guards
                .push(Guard::Sync {
                    mode: SyncMode::ExactlyOne,
                    events: events.clone(),
                }),
            StackAction::CheckLen(n) => current(&mut steps, action)?.guards.push(Guard::Len {
                facet,
                expected: *n,
            }),
            StackAction::CheckAttrLen(n) => {
                current(&mut steps, action)?.guards.push(Guard::Len {
                    facet: LenFacet::Attrs,
                    expected: *n,
                })
            }
            StackAction::Hook(name) => current(&mut steps, action)?
                .wrappers
                .push(Wrapper::Hook(name.clone())),
            StackAction::SetNamedEvent(name) => current(&mut steps, action)?
                .wrappers
                .push(Wrapper::NamedEvent(name.clone())),
            StackAction::PostponeCleanNamedEvent => {
                current(&mut steps, action)?.clean_events = true
            }
            StackAction::StoreAncestorDepth(reg) => current(&mut steps, action)?
                .effects
                .push(Effect::StoreAncestorDepth(*reg)),
            StackAction::CheckAncestorDepth { reg, depth, is_min } => {
                current(&mut steps, action)?
                    .guards
                    .push(Guard::AncestorDepth {
                        reg: *reg,
                        depth: *depth,
                        is_min: *is_min,
                    })
            }
            StackAction::StoreSiblingDepth(reg) => current(&mut steps, action)?
                .effects
                .push(Effect::StoreSiblingDepth(*reg)),
            StackAction::CheckSiblingDepth(regs) => current(&mut steps, action)?
                .guards
                .push(Guard::SiblingDepth(regs.clone())),
            StackAction::Value(_)
            | StackAction::Type(_)
            | StackAction::SubType(_)
            | StackAction::Attr(_)
            | StackAction::Indice(_)
            | StackAction::Key(_)
            | StackAction::CheckNamedEvent(_) => {}
        }
    }

    if !pending.is_empty() {
        let last = steps.last_mut().ok_or_else(|| PslError::Internal {
            message: "capture in a block without discriminants".to_string(),
        })?;
        last.effects.append(&mut pending);
    }
    Ok(steps)
}

/// Threads blocks into the state arena
#[derive(Debug)]
pub(super) struct Builder {
    pub(super) states: Vec<State>,
    pub(super) edges: Vec<Edge>,
}

impl Builder {
    pub(super) fn new() -> Self {
        Self {
            states: vec![State::default()],
            edges: Vec::new(),
        }
    }

    /// Add one block as a path from the initial state
    ///
    /// Non-terminal steps identical to an existing plain edge leaving the
    /// same state reuse that edge. The final step always returns to the
    /// initial state.
    pub(super) fn add_block(&mut self, block: &BasicBlock) -> Result<()> {
        let steps = steps_of(block)?;
        if steps.is_empty() {
            return Err(PslError::Internal {
                message: format!("block {} has no discriminant", block),
            });
        }

        let last = steps.len() - 1;
        let mut at = StateId::INITIAL;
        for (i, step) in steps.into_iter().enumerate() {
            let terminal = i == last;
            if !terminal {
                if let Some(next) = self.shared_edge(at, &step) {
                    at = next;
                    continue;
                }
            }

            let next = if terminal {
                StateId::INITIAL
            } else {
                self.add_state()
            };
            let mut target = Target::State(next);
            for wrapper in step.wrappers.into_iter().rev() {
                target = match wrapper {
                    Wrapper::NamedEvent(name) => Target::NamedEvent {
                        name,
                        next: Box::new(target),
                    },
                    Wrapper::Hook(name) => Target::Hook {
                        name,
                        next: Box::new(target),
                    },
                };
            }

            let edge = EdgeId(self.edges.len() as u32);
            self.edges.push(Edge {
                on: step.on.clone(),
                target,
                guards: step.guards,
                effects: step.effects,
                terminal,
                clean_events: step.clean_events,
                statement: block.statement,
            });
            self.states[at.index()].register(&step.on, edge);
            at = next;
        }
        Ok(())
    }

    /// Set each state's type gate to the smallest completion count any of
    /// its type edges waits for
    pub(super) fn finish(&mut self) {
        for state in &mut self.states {
            let type_edges: BTreeSet<EdgeId> = state
                .types
                .edges()
                .chain(state.covariant.iter().flat_map(|(_, e)| e.iter().copied()))
                .collect();
            state.min_sub_elements = type_edges
                .iter()
                .map(|e| self.edges[e.index()].required_completions())
                .min()
                .unwrap_or(0);
        }
    }

    fn add_state(&mut self) -> StateId {
        let id = StateId(self.states.len() as u32);
        self.states.push(State::default());
        id
    }

    fn shared_edge(&self, at: StateId, step: &Step) -> Option<StateId> {
        if !step.wrappers.is_empty() {
            return None;
        }
        self.states[at.index()]
            .slot(&step.on)
            .into_iter()
            .map(|e| &self.edges[e.index()])
            .find(|edge| {
                !edge.terminal
                    && edge.target.is_plain()
                    && edge.on == step.on
                    && edge.guards == step.guards
                    && edge.effects == step.effects
                    && edge.clean_events == step.clean_events
            })
            .map(|edge| edge.target.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::EventId;

    fn block(actions: Vec<StackAction>) -> BasicBlock {
        BasicBlock {
            statement: 0,
            actions,
        }
    }

    #[test]
    fn test_capture_binds_next_discriminant() {
        let steps = steps_of(&block(vec![
            StackAction::Value(None),
            StackAction::Capture("v".into()),
            StackAction::Type(None),
            StackAction::EndNode,
        ]))
        .unwrap();

        assert_eq!(steps.len(), 2);
        assert!(steps[0].effects.is_empty());
        assert_eq!(steps[1].effects, vec![Effect::Capture("v".into())]);
    }

    #[test]
    fn test_len_guard_uses_facet_marker() {
        let steps = steps_of(&block(vec![
            StackAction::Value(None),
            StackAction::Type(None),
            StackAction::EndKeys,
            StackAction::CheckLen(2),
        ]))
        .unwrap();

        assert_eq!(
            steps[1].guards,
            vec![Guard::Len {
                facet: LenFacet::Keys,
                expected: 2
            }]
        );
    }

    #[test]
    fn test_sync_modes_become_guards() {
        let events = vec![EventId(0), EventId(1)];
        let steps = steps_of(&block(vec![
            StackAction::Value(None),
            StackAction::Type(None),
            StackAction::CheckCleanEventOr(events.clone()),
            StackAction::CheckCleanEventXor(events.clone()),
        ]))
        .unwrap();

        assert_eq!(
            steps[1].guards,
            vec![
                Guard::Sync {
                    mode: SyncMode::Any,
                    events: events.clone()
                },
                Guard::Sync {
                    mode: SyncMode::ExactlyOne,
                    events
                },
            ]
        );
    }

    #[test]
    fn test_common_prefix_is_shared() {
        let mut builder = Builder::new();
        builder
            .add_block(&block(vec![
                StackAction::Value(None),
                StackAction::Type(Some("A".into())),
            ]))
            .unwrap();
        builder
            .add_block(&block(vec![
                StackAction::Value(None),
                StackAction::Type(Some("B".into())),
            ]))
            .unwrap();

        // S0 -value *-> S1 -A()/B()-> S0
        assert_eq!(builder.states.len(), 2);
        assert_eq!(builder.edges.len(), 3);
    }

    #[test]
    fn test_type_gate_is_minimum_over_edges() {
        let mut builder = Builder::new();
        builder
            .add_block(&block(vec![
                StackAction::Value(None),
                StackAction::Type(Some("A".into())),
                StackAction::CheckCleanEventAnd(vec![EventId(0), EventId(1)]),
            ]))
            .unwrap();
        builder
            .add_block(&block(vec![
                StackAction::Value(None),
                StackAction::Type(Some("B".into())),
                StackAction::CheckCleanEventAnd(vec![EventId(2)]),
            ]))
            .unwrap();
        builder.finish();

        assert_eq!(builder.states[1].min_sub_elements(), 1);
    }

    #[test]
    fn test_wrappers_resolve_in_order() {
        let mut builder = Builder::new();
        builder
            .add_block(&block(vec![
                StackAction::Value(None),
                StackAction::Type(None),
                StackAction::SetNamedEvent("e".into()),
                StackAction::Hook("h".into()),
            ]))
            .unwrap();

        let terminal = builder.edges.last().unwrap();
        assert!(terminal.terminal);
        match &terminal.target {
            Target::NamedEvent { name, next } => {
                assert_eq!(name, "e");
                assert!(matches!(**next, Target::Hook { .. }));
            }
            other => panic!("unexpected target {:?}", other),
        }
        assert_eq!(terminal.target.state(), StateId::INITIAL);
    }
}
