//! Named callbacks invoked when a pattern matches

use std::collections::BTreeMap;

use crate::capture::{Binding, CaptureContext};
use crate::subject::NodeId;

/// Arguments handed to a hook
#[derive(Debug, Clone, Copy)]
pub struct HookCall<'a> {
    pub hook: &'a str,
    /// Label of the register whose pattern matched
    pub register: &'a str,
    /// Statement of the pattern's block that matched
    pub statement: usize,
    /// Node whose check completed the match
    pub node: NodeId,
    /// Context of the matched sub-pattern
    pub capture: Option<&'a CaptureContext>,
    /// Names bound by captures along the match
    pub bindings: &'a BTreeMap<String, Binding>,
}

impl<'a> HookCall<'a> {
    pub fn binding(&self, name: &str) -> Option<&'a Binding> {
        self.bindings.get(name)
    }
}

type HookFn<U> = Box<dyn Fn(&HookCall<'_>, &mut U)>;

/// Callables addressed by name from `#hook` patterns
///
/// `U` is the user data a [`crate::LivingContext`] carries through a walk.
pub struct HookRegistry<U> {
    hooks: BTreeMap<String, HookFn<U>>,
}

impl<U> HookRegistry<U> {
    pub fn new() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// Register `hook` under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: Fn(&HookCall<'_>, &mut U) + 'static,
    {
        self.hooks.insert(name.to_string(), Box::new(hook));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hooks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Call the hook named in `call`; returns false if there is none
    pub(crate) fn invoke(&self, call: &HookCall<'_>, user_data: &mut U) -> bool {
        match self.hooks.get(call.hook) {
            Some(hook) => {
                hook(call, user_data);
                true
            }
            None => false,
        }
    }
}

impl<U> Default for HookRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> std::fmt::Debug for HookRegistry<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}
