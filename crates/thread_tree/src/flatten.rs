//! Expansion-aware linearization of the node tree.

use crate::expansion::ExpansionState;
use crate::node::TreeNode;

/// Depth-first, pre-order walk of `nodes`.
///
/// Every visited node is emitted; a node's children are visited only when it
/// is expanded. Emitted nodes are detached copies: they carry no children,
/// and `is_expanded` reports the effective state (always false for leaves).
pub fn flatten(nodes: &[TreeNode], expansion: &ExpansionState) -> Vec<TreeNode> {
    let mut out = Vec::new();
    flatten_into(nodes, expansion, &mut out);
    out
}

fn flatten_into(nodes: &[TreeNode], expansion: &ExpansionState, out: &mut Vec<TreeNode>) {
    for node in nodes {
        let has_children = !node.children.is_empty();
        let expanded = has_children && expansion.is_expanded(&node.id);

        let mut row = node.detached();
        row.has_children = has_children;
        row.is_expanded = expanded;
        out.push(row);

        if expanded {
            flatten_into(&node.children, expansion, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;

    fn node(id: &str, children: Vec<TreeNode>) -> TreeNode {
        let mut node = TreeNode::new(id, id, NodeType::Exchange);
        node.has_children = !children.is_empty();
        node.children = children;
        node
    }

    fn ids(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn pre_order_when_expanded() {
        let tree = vec![
            node("a", vec![node("a1", vec![node("a1x", vec![])]), node("a2", vec![])]),
            node("b", vec![]),
        ];

        let flat = flatten(&tree, &ExpansionState::default());
        assert_eq!(ids(&flat), vec!["a", "a1", "a1x", "a2", "b"]);
        assert!(flat.iter().all(|n| n.children.is_empty()));
        assert!(flat[0].is_expanded && flat[0].has_children);
        assert!(!flat[4].is_expanded && !flat[4].has_children);
    }

    #[test]
    fn collapsed_node_hides_only_its_subtree() {
        let tree = vec![
            node("a", vec![node("a1", vec![node("a1x", vec![])]), node("a2", vec![])]),
            node("b", vec![]),
        ];
        let mut state = ExpansionState::default();
        state.set("a1", false);

        let flat = flatten(&tree, &state);
        assert_eq!(ids(&flat), vec!["a", "a1", "a2", "b"]);
        assert!(!flat[1].is_expanded);
        assert!(flat[1].has_children);
    }
}
