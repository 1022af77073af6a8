//! Expansion state that survives tree rebuilds, keyed by node id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExpansionState {
    default_expanded: bool,
    #[serde(default)]
    overrides: HashMap<String, bool>,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ExpansionState {
    /// `default_expanded` applies to every node that was never set.
    pub fn new(default_expanded: bool) -> Self {
        Self {
            default_expanded,
            overrides: HashMap::new(),
        }
    }

    pub fn is_expanded(&self, node_id: &str) -> bool {
        self.overrides
            .get(node_id)
            .copied()
            .unwrap_or(self.default_expanded)
    }

    pub fn set(&mut self, node_id: impl Into<String>, expanded: bool) {
        self.overrides.insert(node_id.into(), expanded);
    }

    /// Flip the stored state, returning the new value.
    pub fn toggle(&mut self, node_id: &str) -> bool {
        let expanded = !self.is_expanded(node_id);
        self.overrides.insert(node_id.to_string(), expanded);
        expanded
    }

    /// Forget entries for nodes that no longer exist.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.overrides.retain(|id, _| keep(id));
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_nodes_use_default() {
        assert!(ExpansionState::default().is_expanded("T001"));
        assert!(!ExpansionState::new(false).is_expanded("T001"));
    }

    #[test]
    fn toggle_flips_and_persists() {
        let mut state = ExpansionState::default();
        assert!(!state.toggle("T001"));
        assert!(!state.is_expanded("T001"));
        assert!(state.toggle("T001"));
        assert!(state.is_expanded("T001"));
        assert!(state.is_expanded("T002"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn retain_drops_stale_ids() {
        let mut state = ExpansionState::default();
        state.set("T001", false);
        state.set("T002", false);
        state.retain(|id| id == "T002");
        assert!(state.is_expanded("T001"));
        assert!(!state.is_expanded("T002"));
    }
}
