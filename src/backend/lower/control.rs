//! Stack of the control instructions enclosing the statement being lowered.
//! `if`s are tracked too but are never the target of a jump.

use crate::backend::ir::InstId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    If,
    Loop,
    Switch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlEntry {
    pub inst: InstId,
    pub kind: ControlKind,
}

/// What `find_enclosing` may stop at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlFlags {
    /// Nearest loop or switch
    None,
    /// Nearest loop, looking through switches
    ExcludeSwitch,
}

#[derive(Clone, Debug, Default)]
pub struct ControlStack {
    entries: Vec<ControlEntry>,
}

impl ControlStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ControlEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<ControlEntry> {
        self.entries.pop()
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn find_enclosing(&self, flags: ControlFlags) -> Option<ControlEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| match (entry.kind, flags) {
                (ControlKind::Loop, _) => true,
                (ControlKind::Switch, ControlFlags::None) => true,
                (ControlKind::Switch, ControlFlags::ExcludeSwitch) => false,
                (ControlKind::If, _) => false,
            })
            .copied()
    }
}
