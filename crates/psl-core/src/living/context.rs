use std::collections::{BTreeMap, BTreeSet};

use psl_core_types::WalkId;

use crate::automaton::{Edge, EdgeId, Effect, Guard, StateId, StateRegister, SyncMode, Target};
use crate::capture::{Binding, CaptureContext};
use crate::compiler::{DepthReg, EventId, StackAction};
use crate::errors::{PslError, Result};
use crate::hooks::{HookCall, HookRegistry};
use crate::pattern::NamedEvents;
use crate::subject::{NodeId, Subject};

use super::state::{Anchor, LivingState, Position};

/// What the walker is reporting
#[derive(Debug, Clone, Copy)]
enum Check<'s> {
    Value,
    Type,
    Attr(&'s str),
    Indice(usize),
    Key(&'s str),
    Event,
}

impl Check<'_> {
    fn is_facet(&self) -> bool {
        matches!(self, Check::Attr(_) | Check::Indice(_) | Check::Key(_))
    }
}

/// A child block finished for `owner`
#[derive(Debug, Clone)]
struct Completion {
    owner: NodeId,
    event: EventId,
    captures: Vec<CaptureContext>,
    bindings: BTreeMap<String, Binding>,
}

/// A node stored in a depth register
#[derive(Debug, Clone)]
struct DepthRecord {
    reg: DepthReg,
    node: NodeId,
    ancestors: Vec<NodeId>,
    /// Once this node's step ends the record can no longer satisfy a guard
    expires: Option<NodeId>,
}

impl DepthRecord {
    /// Stored node sits `depth` levels (at least, when `is_min`) below `at`
    fn is_below(&self, at: &Position, depth: usize, is_min: bool) -> bool {
        let level = at.depth();
        if self.ancestors.get(level) != Some(&at.node()) {
            return false;
        }
        let distance = self.ancestors.len() - level;
        if is_min {
            distance >= depth
        } else {
            distance == depth
        }
    }

    fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

/// Distance an ancestor guard looks up from a stored node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reach {
    depth: usize,
    is_min: bool,
}

impl Reach {
    /// Registers checked with different distances keep records as long as
    /// the loosest of them
    fn merge(self, other: Reach) -> Reach {
        if self == other {
            self
        } else {
            Reach {
                depth: self.depth.min(other.depth),
                is_min: true,
            }
        }
    }
}

/// Per-register bookkeeping shared by its cursors
#[derive(Debug, Default)]
struct Memory {
    completions: Vec<Completion>,
    ancestors: Vec<DepthRecord>,
    siblings: Vec<DepthRecord>,
    reach: BTreeMap<DepthReg, Reach>,
}

impl Memory {
    fn new(register: &StateRegister) -> Self {
        let mut reach: BTreeMap<DepthReg, Reach> = BTreeMap::new();
        for action in register.blocks().iter().flat_map(|b| b.actions.iter()) {
            if let StackAction::CheckAncestorDepth { reg, depth, is_min } = action {
                let found = Reach {
                    depth: *depth,
                    is_min: *is_min,
                };
                reach
                    .entry(*reg)
                    .and_modify(|r| *r = r.merge(found))
                    .or_insert(found);
            }
        }
        Self {
            reach,
            ..Self::default()
        }
    }

    /// Record `at` for the ancestor guard reading `reg`
    ///
    /// Nothing is kept when no ancestor sits far enough up, or when an
    /// earlier record already answers for the same ancestors.
    fn store_ancestor(&mut self, reg: DepthReg, at: &Position) {
        let Some(reach) = self.reach.get(&reg).copied() else {
            return;
        };
        let Some(level) = at.depth().checked_sub(reach.depth) else {
            return;
        };
        let Some(anchor) = at.ancestors().get(level).copied() else {
            return;
        };
        let covered = self.ancestors.iter().any(|r| {
            r.reg == reg
                && r.ancestors.get(level) == Some(&anchor)
                && (reach.is_min || r.depth() == at.depth())
                && r.depth() >= at.depth()
        });
        if covered {
            return;
        }
        let expires = if reach.is_min {
            at.ancestors().first().copied()
        } else {
            Some(anchor)
        };
        self.ancestors.push(DepthRecord {
            reg,
            node: at.node(),
            ancestors: at.ancestors().to_vec(),
            expires,
        });
    }

    /// Record `at` for the sibling guard reading `reg`
    ///
    /// Two distinct nodes per register and depth are enough to answer any
    /// later guard, so older ones are dropped.
    fn store_sibling(&mut self, reg: DepthReg, at: &Position) {
        let same: Vec<usize> = self
            .siblings
            .iter()
            .enumerate()
            .filter(|(_, r)| r.reg == reg && r.depth() == at.depth())
            .map(|(i, _)| i)
            .collect();
        if same.iter().any(|i| self.siblings[*i].node == at.node()) {
            return;
        }
        if same.len() >= 2 {
            self.siblings.remove(same[0]);
        }
        self.siblings.push(DepthRecord {
            reg,
            node: at.node(),
            ancestors: at.ancestors().to_vec(),
            expires: None,
        });
    }

    /// Drop everything owned by or anchored to `node`, whose step just ended
    fn release(&mut self, node: NodeId) {
        self.completions.retain(|c| c.owner != node);
        self.ancestors.retain(|r| r.expires != Some(node));
    }

    fn has_completion(&self, owner: NodeId, event: EventId) -> bool {
        self.completions
            .iter()
            .any(|c| c.owner == owner && c.event == event)
    }

    fn take_completion(&mut self, owner: NodeId, event: EventId) -> Option<Completion> {
        let index = self
            .completions
            .iter()
            .position(|c| c.owner == owner && c.event == event)?;
        Some(self.completions.remove(index))
    }

    fn completions_for(&self, owner: NodeId) -> usize {
        self.completions.iter().filter(|c| c.owner == owner).count()
    }

    fn guards_hold(&self, edge: &Edge, at: &Position) -> bool {
        edge.guards.iter().all(|guard| match guard {
            Guard::Sync { mode, events } => {
                let present = events
                    .iter()
                    .filter(|ev| self.has_completion(at.node(), **ev))
                    .count();
                match mode {
                    SyncMode::All => present == events.len(),
                    SyncMode::Any => present >= 1,
                    SyncMode::ExactlyOne => present == 1,
                }
            }
            Guard::Len { facet, expected } => at.count(*facet) == *expected,
            Guard::AncestorDepth { reg, depth, is_min } => self
                .ancestors
                .iter()
                .any(|r| r.reg == *reg && r.is_below(at, *depth, *is_min)),
            Guard::SiblingDepth(regs) => regs.iter().all(|reg| {
                edge.effects.contains(&Effect::StoreSiblingDepth(*reg))
                    || self.siblings.iter().any(|r| {
                        r.reg == *reg && r.node != at.node() && r.depth() == at.depth()
                    })
            }),
        })
    }
}

/// Shared state handed to every cursor move
struct Env<'e, 'a, U> {
    hooks: &'a HookRegistry<U>,
    named_events: &'e mut NamedEvents,
    user_data: &'e mut U,
    walk_id: &'e WalkId,
}

/// Cursors and memory of one register
#[derive(Debug)]
struct RegisterRun<'a> {
    register: &'a StateRegister,
    living: Vec<LivingState>,
    memory: Memory,
}

impl<'a> RegisterRun<'a> {
    fn new(register: &'a StateRegister) -> Self {
        Self {
            register,
            living: vec![LivingState::new()],
            memory: Memory::new(register),
        }
    }

    fn accepts(cursor: &LivingState, check: Check<'_>, node: NodeId) -> bool {
        if cursor.have_finished {
            return false;
        }
        match check {
            Check::Value => cursor.anchor == Anchor::Free,
            Check::Type => cursor.anchor == Anchor::Node(node),
            Check::Attr(_) | Check::Indice(_) | Check::Key(_) => {
                cursor.anchor == Anchor::Owner(node)
            }
            Check::Event => true,
        }
    }

    fn candidates(&self, cursor: &LivingState, check: Check<'_>, subject: &dyn Subject) -> Vec<EdgeId> {
        let state = self.register.state(cursor.state);
        match check {
            Check::Value => state.value_edges(subject.canonical_value().as_deref()),
            Check::Type => {
                if self.memory.completions_for(subject.id()) < state.min_sub_elements() {
                    return Vec::new();
                }
                state.type_edges(subject.type_name(), &|t| subject.is_kind_of(t))
            }
            Check::Attr(name) => state.attr_edges(name),
            Check::Indice(index) => state.indice_edges(index),
            Check::Key(key) => state.key_edges(key),
            Check::Event => Vec::new(),
        }
    }

    /// Move every cursor that can consume `check` on `subject`
    fn advance<U>(&mut self, check: Check<'_>, subject: &dyn Subject, env: &mut Env<'_, '_, U>) {
        let at = Position::of(subject);
        let mut forks = Vec::new();
        let mut expired = BTreeSet::new();

        for i in 0..self.living.len() {
            if !Self::accepts(&self.living[i], check, subject.id()) {
                continue;
            }
            let fired: Vec<EdgeId> = self
                .candidates(&self.living[i], check, subject)
                .into_iter()
                .filter(|e| self.memory.guards_hold(self.register.edge(*e), &at))
                .collect();

            if fired.is_empty() {
                let waiting = !self
                    .register
                    .state(self.living[i].state)
                    .event_edges()
                    .is_empty();
                if check.is_facet() && !waiting {
                    expired.insert(i);
                }
                continue;
            }
            self.fire_all(i, &fired, check, &at, env, &mut forks);
        }

        if !expired.is_empty() {
            let mut index = 0;
            self.living.retain(|_| {
                let keep = !expired.contains(&index);
                index += 1;
                keep
            });
        }
        self.living.extend(forks);
    }

    /// Evaluate event edges of every cursor against the named events
    fn check_events<U>(&mut self, env: &mut Env<'_, '_, U>, to_clean: &mut BTreeSet<String>) {
        let mut forks = Vec::new();

        for i in 0..self.living.len() {
            let cursor = &self.living[i];
            if cursor.have_finished {
                continue;
            }
            let Some(at) = cursor.position.clone() else {
                continue;
            };

            let mut fired = Vec::new();
            for edge_id in self.register.state(cursor.state).event_edges() {
                let edge = self.register.edge(*edge_id);
                let crate::automaton::Discriminator::Event(expr) = &edge.on else {
                    continue;
                };
                let mut collected = BTreeSet::new();
                if expr.evaluate(env.named_events, &mut collected)
                    && self.memory.guards_hold(edge, &at)
                {
                    tracing::debug!(
                        walk_id = %env.walk_id,
                        register = self.register.label(),
                        expression = %expr,
                        "precondition satisfied"
                    );
                    if edge.clean_events {
                        to_clean.extend(collected);
                    }
                    fired.push(*edge_id);
                }
            }
            if !fired.is_empty() {
                self.fire_all(i, &fired, Check::Event, &at, env, &mut forks);
            }
        }
        self.living.extend(forks);
    }

    /// Fire `fired` from cursor `i`; all but the last edge go to clones
    fn fire_all<U>(
        &mut self,
        i: usize,
        fired: &[EdgeId],
        check: Check<'_>,
        at: &Position,
        env: &mut Env<'_, '_, U>,
        forks: &mut Vec<LivingState>,
    ) {
        let Some((last, rest)) = fired.split_last() else {
            return;
        };
        for edge_id in rest {
            let mut fork = self.living[i].clone();
            fire(self.register, &mut fork, *edge_id, check, at, &mut self.memory, env);
            forks.push(fork);
        }
        fire(
            self.register,
            &mut self.living[i],
            *last,
            check,
            at,
            &mut self.memory,
            env,
        );
    }

    /// Prune cursors that can no longer progress once `finished` is done
    fn reset(&mut self, finished: Option<NodeId>) {
        let register = self.register;
        self.living.retain(|cursor| {
            if cursor.state == StateId::INITIAL {
                return false;
            }
            if !register.state(cursor.state).event_edges().is_empty() {
                return true;
            }
            match cursor.anchor {
                Anchor::Node(node) | Anchor::Owner(node) => Some(node) != finished,
                Anchor::Detached => false,
                Anchor::Free => true,
            }
        });
        for cursor in &mut self.living {
            cursor.alive = false;
        }
        if let Some(node) = finished {
            self.memory.release(node);
        }
        self.living.push(LivingState::new());
    }
}

/// Take one edge from `cursor`
fn fire<U>(
    register: &StateRegister,
    cursor: &mut LivingState,
    edge_id: EdgeId,
    check: Check<'_>,
    at: &Position,
    memory: &mut Memory,
    env: &mut Env<'_, '_, U>,
) {
    let edge = register.edge(edge_id);
    let from = cursor.state;

    let mut children = Vec::new();
    for guard in &edge.guards {
        if let Guard::Sync { events, .. } = guard {
            for event in events {
                if let Some(done) = memory.take_completion(at.node(), *event) {
                    children.extend(done.captures);
                    cursor.bindings.extend(done.bindings);
                }
            }
        }
    }

    let produced = match check {
        Check::Value => Some(CaptureContext::assemble(at.node(), at.type_name(), Vec::new())),
        Check::Type => Some(CaptureContext::assemble(at.node(), at.type_name(), children)),
        Check::Attr(name) => cursor.capture.take().map(|v| CaptureContext::Attr {
            owner: at.node(),
            name: name.to_string(),
            value: Box::new(v),
        }),
        Check::Indice(index) => cursor.capture.take().map(|v| CaptureContext::Indice {
            owner: at.node(),
            index,
            value: Box::new(v),
        }),
        Check::Key(key) => cursor.capture.take().map(|v| CaptureContext::Key {
            owner: at.node(),
            key: key.to_string(),
            value: Box::new(v),
        }),
        Check::Event => cursor.capture.clone(),
    };
    cursor.capture = produced;
    if matches!(check, Check::Value | Check::Type) {
        cursor.position = Some(at.clone());
    }

    for effect in &edge.effects {
        match effect {
            Effect::Capture(name) => {
                if let Some(ctx) = &cursor.capture {
                    cursor
                        .bindings
                        .insert(name.clone(), Binding::Node(ctx.clone()));
                }
            }
            Effect::CapturePairSecond(name) => {
                if let Some(ctx) = &cursor.capture {
                    cursor
                        .pair_values
                        .insert(name.clone(), ctx.value().clone());
                }
            }
            Effect::CapturePairFirst(name) => {
                if let Some(ctx) = &cursor.capture {
                    let value = cursor
                        .pair_values
                        .remove(name)
                        .unwrap_or_else(|| ctx.value().clone());
                    cursor.bindings.insert(
                        name.clone(),
                        Binding::Pair {
                            key: ctx.facet(),
                            value,
                        },
                    );
                }
            }
            Effect::Complete(event) => {
                let owner = cursor
                    .capture
                    .as_ref()
                    .and_then(CaptureContext::owner)
                    .unwrap_or_else(|| at.node());
                memory.completions.push(Completion {
                    owner,
                    event: *event,
                    captures: cursor.capture.iter().cloned().collect(),
                    bindings: std::mem::take(&mut cursor.bindings),
                });
            }
            Effect::StoreAncestorDepth(reg) => memory.store_ancestor(*reg, at),
            Effect::StoreSiblingDepth(reg) => memory.store_sibling(*reg, at),
        }
    }

    cursor.anchor = match check {
        Check::Value => Anchor::Node(at.node()),
        Check::Type => at.parent().map_or(Anchor::Detached, Anchor::Owner),
        Check::Attr(_) | Check::Indice(_) | Check::Key(_) => Anchor::Detached,
        Check::Event => cursor.anchor,
    };

    let next = resolve(&edge.target, register, edge.statement, cursor, at.node(), env);
    tracing::trace!(
        walk_id = %env.walk_id,
        register = register.label(),
        from = %from,
        to = %next,
        node = %at.node(),
        on = %edge.on,
        "transition"
    );

    cursor.state = next;
    cursor.alive = true;
    if edge.terminal {
        cursor.have_finished = true;
        cursor.anchor = Anchor::Free;
    }
}

/// Follow a composite target, raising events and invoking hooks on the way
fn resolve<U>(
    target: &Target,
    register: &StateRegister,
    statement: usize,
    cursor: &LivingState,
    node: NodeId,
    env: &mut Env<'_, '_, U>,
) -> StateId {
    match target {
        Target::State(state) => *state,
        Target::NamedEvent { name, next } => {
            if env.named_events.raise(name) {
                tracing::debug!(walk_id = %env.walk_id, named_event = %name, "named event raised");
            }
            resolve(next, register, statement, cursor, node, env)
        }
        Target::Hook { name, next } => {
            let call = HookCall {
                hook: name,
                register: register.label(),
                statement,
                node,
                capture: cursor.capture.as_ref(),
                bindings: &cursor.bindings,
            };
            tracing::debug!(walk_id = %env.walk_id, hook = %name, node = %node, "invoking hook");
            env.hooks.invoke(&call, env.user_data);
            resolve(next, register, statement, cursor, node, env)
        }
    }
}

/// Runs one or more registers against a subject walk
///
/// Named events are shared by every register of the context. `U` is user
/// data handed mutably to every hook.
pub struct LivingContext<'a, U> {
    runs: Vec<RegisterRun<'a>>,
    hooks: &'a HookRegistry<U>,
    named_events: NamedEvents,
    user_data: U,
    walk_id: WalkId,
    last_checked: Option<NodeId>,
}

impl<'a, U> LivingContext<'a, U> {
    pub fn new(hooks: &'a HookRegistry<U>, user_data: U) -> Self {
        Self {
            runs: Vec::new(),
            hooks,
            named_events: NamedEvents::new(),
            user_data,
            walk_id: WalkId::new(),
            last_checked: None,
        }
    }

    /// Context running every register in `registers`
    ///
    /// # Errors
    ///
    /// Returns `UnknownHook` if a register names a hook missing from `hooks`.
    pub fn with_registers(
        registers: impl IntoIterator<Item = &'a StateRegister>,
        hooks: &'a HookRegistry<U>,
        user_data: U,
    ) -> Result<Self> {
        let mut context = Self::new(hooks, user_data);
        for register in registers {
            context.add_register(register)?;
        }
        Ok(context)
    }

    /// Add a register with one cursor at its initial state
    ///
    /// # Errors
    ///
    /// Returns `UnknownHook` if the register names a hook missing from the
    /// context's registry.
    pub fn add_register(&mut self, register: &'a StateRegister) -> Result<()> {
        if let Some(missing) = register.hooks().iter().find(|h| !self.hooks.contains(h)) {
            return Err(PslError::UnknownHook {
                hook: missing.clone(),
            });
        }
        self.runs.push(RegisterRun::new(register));
        Ok(())
    }

    /// Use `walk_id` to correlate this walk's log lines
    pub fn with_walk_id(mut self, walk_id: WalkId) -> Self {
        self.walk_id = walk_id;
        self
    }

    pub fn check_value(&mut self, subject: &dyn Subject) {
        self.advance(Check::Value, subject);
    }

    pub fn check_type(&mut self, subject: &dyn Subject) {
        self.last_checked = Some(subject.id());
        self.advance(Check::Type, subject);
    }

    /// Report attribute `name` of `owner`, right after the walk of its value
    pub fn check_attr(&mut self, name: &str, owner: &dyn Subject) {
        self.advance(Check::Attr(name), owner);
    }

    pub fn check_indice(&mut self, index: usize, owner: &dyn Subject) {
        self.advance(Check::Indice(index), owner);
    }

    pub fn check_key(&mut self, key: &str, owner: &dyn Subject) {
        self.advance(Check::Key(key), owner);
    }

    /// Take every event edge whose expression holds
    ///
    /// Events consumed by cleaning preconditions are removed once every
    /// cursor has been evaluated.
    pub fn check_event_expr(&mut self) {
        let mut to_clean = BTreeSet::new();
        let mut env = Env {
            hooks: self.hooks,
            named_events: &mut self.named_events,
            user_data: &mut self.user_data,
            walk_id: &self.walk_id,
        };
        for run in &mut self.runs {
            run.check_events(&mut env, &mut to_clean);
        }
        if !to_clean.is_empty() {
            tracing::debug!(walk_id = %self.walk_id, cleaned = ?to_clean, "named events cleaned");
            self.named_events.clean(&to_clean);
        }
    }

    /// End the current node's step
    ///
    /// Drops cursors that finished, never moved, or were waiting on the node
    /// just checked, then spawns a fresh cursor per register. Completions and
    /// ancestor records tied to that node are released.
    ///
    /// Cursors parked on a precondition are kept whatever node they came
    /// from, since the events they wait for may be raised anywhere later in
    /// the walk. A precondition that never holds therefore keeps one cursor
    /// per node that reached it.
    pub fn reset_living_state(&mut self) {
        let finished = self.last_checked.take();
        for run in &mut self.runs {
            run.reset(finished);
        }
    }

    /// Every cursor sits idle at its initial state
    pub fn is_in_stable_state(&self) -> bool {
        self.runs.iter().all(|run| {
            run.living
                .iter()
                .all(|c| c.state == StateId::INITIAL && !c.alive)
        })
    }

    pub fn named_events(&self) -> &NamedEvents {
        &self.named_events
    }

    pub fn register_count(&self) -> usize {
        self.runs.len()
    }

    /// Cursors currently alive across every register
    pub fn living_count(&self) -> usize {
        self.runs.iter().map(|run| run.living.len()).sum()
    }

    /// Cursors of the `register`-th register
    pub fn living_states(&self, register: usize) -> Option<&[LivingState]> {
        self.runs.get(register).map(|run| run.living.as_slice())
    }

    pub fn walk_id(&self) -> &WalkId {
        &self.walk_id
    }

    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    pub fn user_data_mut(&mut self) -> &mut U {
        &mut self.user_data
    }

    pub fn into_user_data(self) -> U {
        self.user_data
    }

    /// Graphviz rendering with one cluster per register; states holding a
    /// cursor are filled
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph living {\n    rankdir=LR;\n    node [shape=circle];\n");
        for (index, run) in self.runs.iter().enumerate() {
            let occupied: BTreeSet<StateId> = run.living.iter().map(|c| c.state).collect();
            out.push_str(&format!("    subgraph cluster_{} {{\n", index));
            out.push_str(&format!(
                "        label=\"{}\";\n",
                crate::automaton::dot::escape(run.register.label())
            ));
            crate::automaton::dot::write_states(
                &mut out,
                run.register,
                &format!("r{}_", index),
                "        ",
                &occupied,
            );
            out.push_str("    }\n");
        }
        out.push_str("}\n");
        out
    }

    fn advance(&mut self, check: Check<'_>, subject: &dyn Subject) {
        let mut env = Env {
            hooks: self.hooks,
            named_events: &mut self.named_events,
            user_data: &mut self.user_data,
            walk_id: &self.walk_id,
        };
        for run in &mut self.runs {
            run.advance(check, subject, &mut env);
        }
    }
}

impl<U: std::fmt::Debug> std::fmt::Debug for LivingContext<'_, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivingContext")
            .field("walk_id", &self.walk_id)
            .field("registers", &self.runs.len())
            .field("living", &self.living_count())
            .field("named_events", &self.named_events)
            .field("user_data", &self.user_data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{EventExpr, PatternBuilder, TypeOptions};
    use crate::subject::{walk, Tree};

    fn counting_hooks() -> HookRegistry<usize> {
        let mut hooks = HookRegistry::new();
        hooks.register("h", |_, hits: &mut usize| *hits += 1);
        hooks
    }

    fn list_of(item: serde_json::Value, count: usize) -> Tree {
        Tree::from_json(&serde_json::Value::Array(vec![item; count])).unwrap()
    }

    #[test]
    fn test_ancestor_records_released_with_their_anchor() {
        // Foo(.x=1) => #h;
        let mut b = PatternBuilder::new();
        let one = b.value(1);
        let x = b.attr(Some("x"), one).unwrap();
        let foo = b
            .type_match("Foo", Some(vec![x]), None, TypeOptions::default())
            .unwrap();
        let hooked = b.hook("h", foo).unwrap();
        let pattern = b.finish(hooked).unwrap();

        let hooks = counting_hooks();
        let register = StateRegister::compile(&pattern, &hooks).unwrap();
        let mut living = LivingContext::with_registers([&register], &hooks, 0).unwrap();
        walk(&list_of(serde_json::json!({"$type": "Foo", "x": 1}), 500), &mut living).unwrap();

        assert!(living.runs[0].memory.ancestors.is_empty());
        assert!(living.runs[0].memory.completions.is_empty());
        assert_eq!(living.into_user_data(), 500);
    }

    #[test]
    fn test_sibling_records_bounded_per_depth() {
        // A ~~ B => #h;
        let mut b = PatternBuilder::new();
        let a = b.ty("A").unwrap();
        let bb = b.ty("B").unwrap();
        let siblings = b.sibling(vec![a, bb]).unwrap();
        let hooked = b.hook("h", siblings).unwrap();
        let pattern = b.finish(hooked).unwrap();

        let hooks = counting_hooks();
        let register = StateRegister::compile(&pattern, &hooks).unwrap();
        let mut living = LivingContext::with_registers([&register], &hooks, 0).unwrap();
        walk(&list_of(serde_json::json!({"$type": "A"}), 300), &mut living).unwrap();

        assert!(living.runs[0].memory.siblings.len() <= 2);
    }

    #[test]
    fn test_precondition_cursors_outlive_their_node() {
        // Z && (a) => #h; with `a` never raised
        let mut b = PatternBuilder::new();
        let z = b.ty("Z").unwrap();
        let guarded = b.precondition(z, EventExpr::named("a"), true).unwrap();
        let hooked = b.hook("h", guarded).unwrap();
        let pattern = b.finish(hooked).unwrap();

        let hooks = counting_hooks();
        let register = StateRegister::compile(&pattern, &hooks).unwrap();
        let mut living = LivingContext::with_registers([&register], &hooks, 0).unwrap();
        walk(&list_of(serde_json::json!({"$type": "Z"}), 200), &mut living).unwrap();

        assert_eq!(living.living_count(), 201);
        assert_eq!(living.into_user_data(), 0);
    }
}
