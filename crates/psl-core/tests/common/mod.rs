use std::collections::BTreeMap;

use psl_core::{
    walk, Binding, CaptureContext, HookRegistry, LivingContext, NodeId, Pattern, StateRegister,
    Tree,
};
use serde_json::Value;

/// One hook invocation recorded during a walk
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub hook: String,
    pub node: NodeId,
    pub capture: Option<CaptureContext>,
    pub bindings: BTreeMap<String, Binding>,
}

/// Registry whose hooks all record into the walk's user data
#[allow(dead_code)]
pub fn recording_hooks(names: &[&str]) -> HookRegistry<Vec<Hit>> {
    let mut hooks = HookRegistry::new();
    for name in names {
        hooks.register(name, |call, hits: &mut Vec<Hit>| {
            hits.push(Hit {
                hook: call.hook.to_string(),
                node: call.node,
                capture: call.capture.cloned(),
                bindings: call.bindings.clone(),
            })
        });
    }
    hooks
}

/// Compile `pattern`, walk `tree` and return every hook invocation
#[allow(dead_code)]
pub fn run(pattern: &Pattern, tree: &Tree) -> Vec<Hit> {
    let names: Vec<&str> = pattern.hook_names().into_iter().collect();
    let hooks = recording_hooks(&names);
    let register = StateRegister::compile(pattern, &hooks).unwrap();
    let mut living = LivingContext::with_registers([&register], &hooks, Vec::new()).unwrap();
    walk(tree, &mut living).unwrap();
    living.into_user_data()
}

/// Subject tree from JSON
#[allow(dead_code)]
pub fn tree(document: Value) -> Tree {
    Tree::from_json(&document).unwrap()
}

/// Names of the hooks that fired, in order
#[allow(dead_code)]
pub fn hook_names(hits: &[Hit]) -> Vec<&str> {
    hits.iter().map(|h| h.hook.as_str()).collect()
}
