//! Graphviz export for registers and living contexts

use std::collections::BTreeSet;
use std::fmt::Write;

use super::{Edge, Effect, Guard, StateId, StateRegister, SyncMode, Target};

/// Escape text for a double-quoted DOT string
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// Standalone graph for one register
pub(crate) fn register_graph(register: &StateRegister) -> String {
    let mut out = format!("digraph \"{}\" {{\n", escape(register.label()));
    out.push_str("    rankdir=LR;\n    node [shape=circle];\n");
    write_states(&mut out, register, "", "    ", &BTreeSet::new());
    out.push_str("}\n");
    out
}

/// States and edges of `register`, node names prefixed with `prefix`
///
/// States in `occupied` are filled, marking where cursors currently sit.
pub(crate) fn write_states(
    out: &mut String,
    register: &StateRegister,
    prefix: &str,
    indent: &str,
    occupied: &BTreeSet<StateId>,
) {
    for (id, state) in register.states() {
        let shape = if id == StateId::INITIAL {
            "doublecircle"
        } else {
            "circle"
        };
        let fill = if occupied.contains(&id) {
            ", style=filled, fillcolor=lightblue"
        } else {
            ""
        };
        let gate = if state.min_sub_elements() > 0 {
            format!("\\n>={}", state.min_sub_elements())
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{}{}{} [label=\"{}{}\", shape={}{}];",
            indent, prefix, id, id, gate, shape, fill
        );
    }
    for (id, state) in register.states() {
        for edge_id in state.outgoing() {
            let edge = register.edge(edge_id);
            let _ = writeln!(
                out,
                "{}{}{} -> {}{} [label=\"{}\"{}];",
                indent,
                prefix,
                id,
                prefix,
                edge.target.state(),
                escape(&edge_label(edge)),
                if edge.terminal { ", style=bold" } else { "" }
            );
        }
    }
}

fn edge_label(edge: &Edge) -> String {
    let mut label = edge.on.to_string();
    for guard in &edge.guards {
        label.push(' ');
        label.push_str(&guard_label(guard));
    }
    for effect in &edge.effects {
        label.push(' ');
        label.push_str(&effect_label(effect));
    }
    if edge.clean_events {
        label.push_str(" clean");
    }
    let mut target = &edge.target;
    loop {
        match target {
            Target::State(_) => break,
            Target::NamedEvent { name, next } => {
                let _ = write!(label, " => {}", name);
                target = next;
            }
            Target::Hook { name, next } => {
                let _ = write!(label, " => #{}", name);
                target = next;
            }
        }
    }
    label
}

fn guard_label(guard: &Guard) -> String {
    match guard {
        Guard::Sync { mode, events } => {
            let op = match mode {
                SyncMode::All => "and",
                SyncMode::Any => "or",
                SyncMode::ExactlyOne => "xor",
            };
            let events: Vec<String> = events.iter().map(ToString::to_string).collect();
            format!("{}({})", op, events.join(","))
        }
        Guard::Len { facet, expected } => format!("len({:?})=={}", facet, expected),
        Guard::AncestorDepth { reg, depth, is_min } => {
            format!("{}{}{}", reg, if *is_min { ">=" } else { "==" }, depth)
        }
        Guard::SiblingDepth(regs) => {
            let regs: Vec<String> = regs.iter().map(ToString::to_string).collect();
            format!("sib({})", regs.join(","))
        }
    }
}

fn effect_label(effect: &Effect) -> String {
    match effect {
        Effect::Capture(name) => format!("->{}", name),
        Effect::CapturePairFirst(name) | Effect::CapturePairSecond(name) => {
            format!("->>{}", name)
        }
        Effect::Complete(event) => format!("!{}", event),
        Effect::StoreAncestorDepth(reg) | Effect::StoreSiblingDepth(reg) => {
            format!("{}:=", reg)
        }
    }
}
