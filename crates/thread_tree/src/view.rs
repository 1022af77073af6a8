//! Entry points for the rendering side.

use point_core::{GraphStore, Point, ThreadConfig};

use crate::builder::build_tree;
use crate::expansion::ExpansionState;
use crate::flatten::flatten;
use crate::node::TreeNode;

/// Build and flatten in one step.
pub fn build_flat_tree_list(
    store: &GraphStore,
    root_order: &[Point],
    expansion: &ExpansionState,
) -> Vec<TreeNode> {
    let tree = build_tree(store, root_order);
    flatten(&tree, expansion)
}

/// Look up `ids` in the store, skipping (and logging) ids it does not hold.
pub fn resolve_root_order<S: AsRef<str>>(store: &GraphStore, ids: &[S]) -> Vec<Point> {
    ids.iter()
        .filter_map(|id| {
            let id = id.as_ref();
            let point = store.get(id).cloned();
            if point.is_none() {
                tracing::warn!(point_id = id, "resolve_root_order: point not in store");
            }
            point
        })
        .collect()
}

/// Holds the expansion state across rebuilds of the tree.
#[derive(Debug, Clone, Default)]
pub struct TreeView {
    expansion: ExpansionState,
}

impl TreeView {
    pub fn new(expansion: ExpansionState) -> Self {
        Self { expansion }
    }

    pub fn from_config(config: &ThreadConfig) -> Self {
        Self::new(ExpansionState::new(config.default_expanded))
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn build_flat_tree_list(&self, store: &GraphStore, root_order: &[Point]) -> Vec<TreeNode> {
        build_flat_tree_list(store, root_order, &self.expansion)
    }

    /// Build and flatten, first dropping expansion entries for nodes that are
    /// no longer anywhere in the tree (collapsed subtrees included).
    pub fn rebuild(&mut self, store: &GraphStore, root_order: &[Point]) -> Vec<TreeNode> {
        let tree = build_tree(store, root_order);
        let before = self.expansion.len();
        self.expansion
            .retain(|id| tree.iter().any(|node| node.find(id).is_some()));
        if self.expansion.len() < before {
            tracing::debug!(
                removed = before - self.expansion.len(),
                "TreeView: pruned stale expansion entries"
            );
        }
        flatten(&tree, &self.expansion)
    }

    /// Flip a node's expansion. Callers rebuild the flat list afterwards.
    pub fn toggle_expansion(&mut self, node_id: &str) -> bool {
        let expanded = self.expansion.toggle(node_id);
        tracing::debug!(node_id, expanded, "TreeView: toggled expansion");
        expanded
    }
}
