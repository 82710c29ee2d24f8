//! Lexical scopes mapping source names to lowered IR values.
//! Each level is a persistent map: pushing clones the current map in O(1)
//! and popping restores the saved one, so shadowed names come back.

use crate::backend::ir::ValueId;
use im::HashMap;

#[derive(Clone, Debug, Default)]
pub struct ScopeStack {
    current: HashMap<String, ValueId>,
    saved: Vec<HashMap<String, ValueId>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.saved.push(self.current.clone());
    }

    pub fn pop(&mut self) {
        if let Some(previous) = self.saved.pop() {
            self.current = previous;
        }
    }

    /// Number of open scopes above the module scope
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn set(&mut self, name: &str, value: ValueId) {
        self.current.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<ValueId> {
        self.current.get(name).copied()
    }
}
