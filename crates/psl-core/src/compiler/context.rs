use std::collections::BTreeMap;

use super::action::{DepthReg, EventId};

/// Counters and labels threaded through one compilation
///
/// Event ids and depth registers are compile-time identifiers: unique and
/// monotonic within one compiled pattern, never derived from subject data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileContext {
    next_event: u32,
    next_depth_reg: u32,
    event_labels: BTreeMap<EventId, String>,
    depth_labels: BTreeMap<DepthReg, String>,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a completion event for the sub-pattern rendered as `label`
    pub fn fresh_event(&mut self, label: impl Into<String>) -> EventId {
        let id = EventId(self.next_event);
        self.next_event += 1;
        self.event_labels.insert(id, label.into());
        id
    }

    /// Allocate a depth register for the sub-pattern rendered as `label`
    pub fn fresh_depth_reg(&mut self, label: impl Into<String>) -> DepthReg {
        let reg = DepthReg(self.next_depth_reg);
        self.next_depth_reg += 1;
        self.depth_labels.insert(reg, label.into());
        reg
    }

    pub fn event_label(&self, id: EventId) -> Option<&str> {
        self.event_labels.get(&id).map(String::as_str)
    }

    pub fn depth_label(&self, reg: DepthReg) -> Option<&str> {
        self.depth_labels.get(&reg).map(String::as_str)
    }

    pub fn event_count(&self) -> usize {
        self.next_event as usize
    }

    pub fn depth_reg_count(&self) -> usize {
        self.next_depth_reg as usize
    }
}
