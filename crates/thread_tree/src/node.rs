use point_core::{PointId, ShardId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    /// A whole prompt/response pair.
    Exchange,
    /// A whole prompt/response pair forked from a parent's shard.
    Shard,
    /// One slice of a split response.
    ShardResponse,
}

/// Display projection of a point, rebuilt from scratch on every build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeNode {
    /// Point id for main nodes, synthetic for segment, after and fallback nodes.
    pub id: String,
    pub point_id: PointId,
    pub parent_id: Option<String>,
    pub level: usize,
    pub is_expanded: bool,
    pub has_children: bool,
    pub prompt_content: Option<String>,
    pub response_content: Option<String>,
    pub node_type: NodeType,
    /// Set on segment nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_id: Option<ShardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_start_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_end_position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub(crate) fn new(id: impl Into<String>, point_id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            point_id: point_id.into(),
            parent_id: None,
            level: 0,
            is_expanded: true,
            has_children: false,
            prompt_content: None,
            response_content: None,
            node_type,
            shard_id: None,
            shard_start_position: None,
            shard_end_position: None,
            selected_text: None,
            children: Vec::new(),
        }
    }

    /// Copy of this node without its children.
    pub fn detached(&self) -> Self {
        Self {
            id: self.id.clone(),
            point_id: self.point_id.clone(),
            parent_id: self.parent_id.clone(),
            level: self.level,
            is_expanded: self.is_expanded,
            has_children: self.has_children,
            prompt_content: self.prompt_content.clone(),
            response_content: self.response_content.clone(),
            node_type: self.node_type,
            shard_id: self.shard_id.clone(),
            shard_start_position: self.shard_start_position,
            shard_end_position: self.shard_end_position,
            selected_text: self.selected_text.clone(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::subtree_len).sum::<usize>()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

pub fn segment_node_id(point_id: &str, shard_id: &str) -> String {
    format!("{point_id}::shard::{shard_id}")
}

pub fn after_node_id(point_id: &str) -> String {
    format!("{point_id}::after")
}

pub fn fallback_node_id(point_id: &str) -> String {
    format!("{point_id}::full")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_serializes_camel_case() {
        let node = TreeNode::new(segment_node_id("T001", "shard-1"), "T001", NodeType::ShardResponse);
        let value = serde_json::to_value(&node).expect("serialize");
        assert_eq!(value["id"], json!("T001::shard::shard-1"));
        assert_eq!(value["node_type"], json!("shardResponse"));
        assert!(value.get("shard_id").is_none());
    }

    #[test]
    fn detached_drops_children_only() {
        let mut parent = TreeNode::new("T001", "T001", NodeType::Exchange);
        parent.has_children = true;
        parent.children.push(TreeNode::new(after_node_id("T001"), "T001", NodeType::ShardResponse));

        let row = parent.detached();
        assert!(row.children.is_empty());
        assert!(row.has_children);
        assert_eq!(parent.subtree_len(), 2);
        assert_eq!(parent.find("T001::after").map(|n| n.node_type), Some(NodeType::ShardResponse));
        assert_eq!(fallback_node_id("T001"), "T001::full");
    }
}
