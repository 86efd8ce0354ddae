use std::collections::BTreeSet;

use crate::compiler::{compile, BasicBlock, CompileContext, CompiledPattern};
use crate::errors::{PslError, Result};
use crate::hooks::HookRegistry;
use crate::pattern::Pattern;
use crate::{log_op_end, log_op_error, log_op_start};

use super::builder::Builder;
use super::{Edge, EdgeId, State, StateId};

/// Automaton built from one pattern
///
/// Owns every state and edge; [`StateId::INITIAL`] is the entry point and
/// the state every completed block returns to.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRegister {
    label: String,
    states: Vec<State>,
    edges: Vec<Edge>,
    blocks: Vec<BasicBlock>,
    context: CompileContext,
    hooks: BTreeSet<String>,
    named_events: BTreeSet<String>,
}

impl StateRegister {
    /// Compile `pattern` and build its automaton
    ///
    /// # Errors
    ///
    /// Returns `UnknownHook` if the pattern names a hook missing from
    /// `hooks`, or any error raised while compiling the pattern.
    pub fn compile<U>(pattern: &Pattern, hooks: &HookRegistry<U>) -> Result<Self> {
        log_op_start!("build_register", pattern_len = pattern.len());
        let start = std::time::Instant::now();

        let result = Self::compile_impl(pattern, hooks).map_err(|e| {
            log_op_error!(
                "build_register",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "build_register",
            duration_ms = start.elapsed().as_millis() as u64,
            state_count = result.state_count(),
            edge_count = result.edge_count()
        );

        Ok(result)
    }

    fn compile_impl<U>(pattern: &Pattern, hooks: &HookRegistry<U>) -> Result<Self> {
        if let Some(missing) = pattern.hook_names().into_iter().find(|h| !hooks.contains(h)) {
            return Err(PslError::UnknownHook {
                hook: missing.to_string(),
            });
        }
        Self::from_compiled(compile(pattern)?)
    }

    /// Build the automaton for an already compiled pattern
    ///
    /// Hook names are not checked here; a living context checks them
    /// against its registry when the register is added.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a block has no discriminant.
    pub fn from_compiled(compiled: CompiledPattern) -> Result<Self> {
        let mut builder = Builder::new();
        for block in &compiled.blocks {
            builder.add_block(block)?;
        }
        builder.finish();

        Ok(Self {
            label: compiled.label,
            states: builder.states,
            edges: builder.edges,
            blocks: compiled.blocks,
            context: compiled.context,
            hooks: compiled.hooks,
            named_events: compiled.named_events,
        })
    }

    /// PSL text of the pattern
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn initial(&self) -> &State {
        &self.states[StateId::INITIAL.index()]
    }

    /// State behind a handle handed out by this register
    ///
    /// Handles from other registers are a caller bug; use
    /// [`StateRegister::get_state`] when the handle is untrusted.
    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    /// # Errors
    ///
    /// Returns `UnknownState` if `id` is not a state of this register.
    pub fn get_state(&self, id: StateId) -> Result<&State> {
        self.states.get(id.index()).ok_or_else(|| PslError::UnknownState {
            state: id.raw(),
            register: self.label.clone(),
        })
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateId(i as u32), s))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn context(&self) -> &CompileContext {
        &self.context
    }

    pub fn hooks(&self) -> &BTreeSet<String> {
        &self.hooks
    }

    pub fn named_events(&self) -> &BTreeSet<String> {
        &self.named_events
    }

    /// Graphviz rendering of the automaton
    pub fn to_dot(&self) -> String {
        super::dot::register_graph(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Target;
    use crate::pattern::PatternBuilder;

    fn foo_hook_pattern() -> Pattern {
        let mut b = PatternBuilder::new();
        let one = b.value(1);
        let x = b.attr(Some("x"), one).unwrap();
        let foo = b.type_match("Foo", Some(vec![x]), None, Default::default()).unwrap();
        let hooked = b.hook("on_foo", foo).unwrap();
        b.finish(hooked).unwrap()
    }

    #[test]
    fn test_unknown_hook_rejected() {
        let hooks: HookRegistry<()> = HookRegistry::new();
        let err = StateRegister::compile(&foo_hook_pattern(), &hooks).unwrap_err();
        assert_eq!(
            err,
            PslError::UnknownHook {
                hook: "on_foo".into()
            }
        );
    }

    #[test]
    fn test_compile_builds_states() {
        let mut hooks: HookRegistry<()> = HookRegistry::new();
        hooks.register("on_foo", |_, _| {});
        let register = StateRegister::compile(&foo_hook_pattern(), &hooks).unwrap();

        assert_eq!(register.label(), "Foo(.x=1) => #on_foo;");
        assert!(register.state_count() > 1);
        assert!(register.hooks().contains("on_foo"));

        let hooked = (0..register.edge_count())
            .map(|i| register.edge(EdgeId(i as u32)))
            .filter(|e| matches!(e.target, Target::Hook { .. }))
            .count();
        assert_eq!(hooked, 1);
    }

    #[test]
    fn test_get_state_out_of_range() {
        let hooks: HookRegistry<()> = HookRegistry::new();
        let mut b = PatternBuilder::new();
        let v = b.any_value();
        let register = StateRegister::compile(&b.finish(v).unwrap(), &hooks).unwrap();

        assert!(register.get_state(StateId::INITIAL).is_ok());
        let err = register.get_state(StateId::from_raw(99)).unwrap_err();
        assert!(matches!(err, PslError::UnknownState { state: 99, .. }));
    }
}
