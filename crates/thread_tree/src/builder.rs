//! Tree construction from the graph store
//!
//! Nodes live in an index-addressed arena while the tree is assembled, and
//! are materialized into nested [`TreeNode`]s at the end:
//!
//! 1. Node creation: every point in the root order (and, through shard
//!    children, every point forked from it) gets a main node, plus segment and
//!    "after" nodes when its response is split by shards.
//! 2. Hierarchy assembly: non-root points are attached under their structural
//!    parent, either the parent's main node or the segment they forked from.
//! 3. Flags: `has_children`, together with `level` and `parent_id`, is derived
//!    from the final shape.

use std::collections::{HashMap, HashSet};

use point_core::text::{char_len, char_slice, char_tail};
use point_core::{GraphStore, Point, Shard};

use crate::node::{after_node_id, fallback_node_id, segment_node_id, NodeType, TreeNode};

/// Build the display tree for `root_order`, the active top-level sequence.
///
/// Returns an empty tree when the store or the root order is empty. Malformed
/// points degrade to simpler representations instead of failing the build.
///
/// A plain continuation of a split point hangs under that point's prompt
/// node, so it flattens before the point's response segments.
pub fn build_tree(store: &GraphStore, root_order: &[Point]) -> Vec<TreeNode> {
    if store.is_empty() || root_order.is_empty() {
        tracing::debug!(
            store_len = store.len(),
            root_order_len = root_order.len(),
            "build_tree: nothing to build"
        );
        return Vec::new();
    }

    let mut builder = TreeBuilder::new(store);
    for point in root_order {
        builder.ensure_point(point);
    }
    let top_level = builder.assemble(root_order);
    builder.materialize_all(&top_level)
}

/// Arena indices of the nodes produced for one point.
#[derive(Debug, Clone)]
struct PointNodes {
    main: usize,
    /// Segment and after nodes, in response order.
    siblings: Vec<usize>,
}

struct TreeBuilder<'a> {
    store: &'a GraphStore,
    nodes: Vec<TreeNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    index: HashMap<String, usize>,
    groups: HashMap<String, PointNodes>,
    in_progress: HashSet<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            nodes: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            index: HashMap::new(),
            groups: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn push(&mut self, node: TreeNode) -> usize {
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        self.children.push(Vec::new());
        self.parents.push(None);
        idx
    }

    /// Attach `child` under `parent`. Refuses nodes that already have a
    /// parent and attachments that would close a cycle.
    fn attach(&mut self, parent: usize, child: usize) -> bool {
        if self.parents[child].is_some() {
            return false;
        }
        if self.is_within(parent, child) {
            tracing::warn!(
                parent = %self.nodes[parent].id,
                child = %self.nodes[child].id,
                "build_tree: refusing attachment that would create a cycle"
            );
            return false;
        }
        self.parents[child] = Some(parent);
        self.children[parent].push(child);
        true
    }

    /// Whether `node` is `root` or lies in `root`'s subtree.
    fn is_within(&self, node: usize, root: usize) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == root {
                return true;
            }
            current = self.parents[idx];
        }
        false
    }

    fn attach_group(&mut self, parent: usize, group: &PointNodes) {
        if self.attach(parent, group.main) {
            for &sibling in &group.siblings {
                self.attach(parent, sibling);
            }
        }
    }

    /// Pass 1 for one point: its nodes, created once per build.
    fn ensure_point(&mut self, point: &'a Point) -> Option<PointNodes> {
        if let Some(group) = self.groups.get(&point.id) {
            return Some(group.clone());
        }
        if point.exchanges.is_empty() {
            tracing::debug!(point_id = %point.id, "build_tree: skipping point without exchanges");
            return None;
        }
        if !self.in_progress.insert(point.id.clone()) {
            tracing::warn!(point_id = %point.id, "build_tree: shard children form a cycle");
            return None;
        }

        let group = match point.response_content() {
            Some(response) if !point.shards.is_empty() => {
                self.create_shard_split_nodes(point, response)
            }
            _ => PointNodes {
                main: self.push(exchange_node(point, true)),
                siblings: Vec::new(),
            },
        };

        self.in_progress.remove(&point.id);
        self.groups.insert(point.id.clone(), group.clone());
        Some(group)
    }

    /// Split a response into a prompt-only main node, one segment per valid
    /// shard and a trailing "after" node. Forked children hang under the
    /// segment of the shard they came from.
    fn create_shard_split_nodes(&mut self, point: &'a Point, response: &'a str) -> PointNodes {
        let store = self.store;
        let len = char_len(response);
        let main = self.push(exchange_node(point, false));

        let mut seen = HashSet::new();
        let mut valid: Vec<&'a Shard> = point
            .shards
            .iter()
            .filter(|shard| shard.anchor.fits(len))
            .filter(|shard| seen.insert(shard.shard_id.as_str()))
            .collect();
        if valid.len() < point.shards.len() {
            tracing::warn!(
                point_id = %point.id,
                skipped = point.shards.len() - valid.len(),
                response_len = len,
                "build_tree: excluding shards with invalid anchors"
            );
        }

        if valid.is_empty() {
            let mut fallback = TreeNode::new(fallback_node_id(&point.id), &point.id, NodeType::ShardResponse);
            fallback.response_content = Some(response.to_string());
            let fallback = self.push(fallback);
            self.attach(main, fallback);
            return PointNodes {
                main,
                siblings: Vec::new(),
            };
        }

        valid.sort_by(|a, b| {
            a.anchor
                .start_position
                .cmp(&b.anchor.start_position)
                .then_with(|| a.shard_id.cmp(&b.shard_id))
        });

        let mut siblings = Vec::new();
        let mut cursor = 0;
        for shard in valid {
            let end = shard.anchor.end_position;
            if cursor >= end || cursor >= len {
                tracing::warn!(
                    point_id = %point.id,
                    shard_id = %shard.shard_id,
                    cursor,
                    end,
                    "build_tree: skipping overlapping shard"
                );
                continue;
            }

            let mut node = TreeNode::new(
                segment_node_id(&point.id, &shard.shard_id),
                &point.id,
                NodeType::ShardResponse,
            );
            node.response_content = Some(char_slice(response, cursor, end.min(len)).to_string());
            node.shard_id = Some(shard.shard_id.clone());
            node.shard_start_position = Some(cursor);
            node.shard_end_position = Some(end);
            node.selected_text = Some(shard.anchor.selected_text.clone());
            let segment = self.push(node);
            siblings.push(segment);

            for child_id in &shard.children {
                let Some(child) = store.get(child_id) else {
                    tracing::warn!(
                        point_id = %point.id,
                        shard_id = %shard.shard_id,
                        child_id = %child_id,
                        "build_tree: shard child missing from store"
                    );
                    continue;
                };
                if let Some(group) = self.ensure_point(child) {
                    self.attach_group(segment, &group);
                }
            }

            cursor = end;
        }

        if cursor < len {
            let mut after = TreeNode::new(after_node_id(&point.id), &point.id, NodeType::ShardResponse);
            after.response_content = Some(char_tail(response, cursor).to_string());
            after.shard_start_position = Some(cursor);
            after.shard_end_position = Some(len);
            siblings.push(self.push(after));
        }

        PointNodes { main, siblings }
    }

    /// Pass 2: returns the top-level node indices in display order.
    fn assemble(&mut self, root_order: &[Point]) -> Vec<usize> {
        let mut top_level = Vec::new();
        let mut placed = HashSet::new();

        for point in root_order {
            let Some(group) = self.groups.get(&point.id).cloned() else {
                continue;
            };
            if self.parents[group.main].is_some() || !placed.insert(point.id.as_str()) {
                continue;
            }

            if !point.is_root() {
                match self.structural_parent(point) {
                    Some(parent) if self.attach(parent, group.main) => {
                        for &sibling in &group.siblings {
                            self.attach(parent, sibling);
                        }
                        continue;
                    }
                    _ => tracing::warn!(
                        point_id = %point.id,
                        parent_id = %point.parent_point_id,
                        "build_tree: parent not in tree, showing point at top level"
                    ),
                }
            }

            top_level.push(group.main);
            top_level.extend(group.siblings.iter().copied());
        }

        top_level
    }

    /// The segment a shard child forked from, else the parent's main node.
    fn structural_parent(&self, point: &Point) -> Option<usize> {
        let segment = point.parent_shard_id.as_ref().and_then(|shard_id| {
            self.index
                .get(&segment_node_id(&point.parent_point_id, shard_id))
                .copied()
        });
        segment.or_else(|| {
            self.groups
                .get(&point.parent_point_id)
                .map(|group| group.main)
        })
    }

    /// Pass 3 and materialization.
    fn materialize_all(&self, top_level: &[usize]) -> Vec<TreeNode> {
        top_level
            .iter()
            .map(|&idx| self.materialize(idx, None, 0))
            .collect()
    }

    fn materialize(&self, idx: usize, parent_id: Option<&str>, level: usize) -> TreeNode {
        let id = self.nodes[idx].id.as_str();
        let children: Vec<TreeNode> = self.children[idx]
            .iter()
            .map(|&child| self.materialize(child, Some(id), level + 1))
            .collect();

        let mut node = self.nodes[idx].clone();
        node.parent_id = parent_id.map(str::to_string);
        node.level = level;
        node.has_children = !children.is_empty();
        node.children = children;
        node
    }
}

/// Main node for a point; `with_response` is false for split points.
fn exchange_node(point: &Point, with_response: bool) -> TreeNode {
    let node_type = if point.is_shard_child() {
        NodeType::Shard
    } else {
        NodeType::Exchange
    };
    let mut node = TreeNode::new(point.id.clone(), point.id.clone(), node_type);
    node.prompt_content = point.prompt_content().map(str::to_string);
    if with_response {
        node.response_content = point.response_content().map(str::to_string);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use point_core::{Anchor, Response};

    #[test]
    fn empty_inputs_build_empty_tree() {
        let store = GraphStore::new();
        assert!(build_tree(&store, &[Point::root("T001", "q")]).is_empty());

        let store: GraphStore = vec![Point::root("T001", "q")].into_iter().collect();
        assert!(build_tree(&store, &[]).is_empty());
    }

    #[test]
    fn duplicate_shard_ids_produce_one_segment() {
        let mut point = Point::root("T001", "q").with_response(Response::text("abcdef"));
        point.shards = vec![
            Shard::new("s", Anchor::new(0, 2, "ab")),
            Shard::new("s", Anchor::new(3, 4, "d")),
        ];
        let store: GraphStore = vec![point.clone()].into_iter().collect();

        let tree = build_tree(&store, &[point]);
        let segments: Vec<&str> = tree
            .iter()
            .filter(|n| n.shard_id.is_some())
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(segments, vec!["T001::shard::s"]);
    }

    #[test]
    fn shard_cycle_does_not_recurse_forever() {
        let mut a = Point::root("A", "a").with_response(Response::text("alpha"));
        a.shards = vec![Shard {
            shard_id: "s".into(),
            children: vec!["B".into()],
            anchor: Anchor::new(0, 2, "al"),
        }];
        let mut b = Point::child("B", "A", "b")
            .with_parent_shard("s")
            .with_response(Response::text("beta"));
        b.shards = vec![Shard {
            shard_id: "t".into(),
            children: vec!["A".into()],
            anchor: Anchor::new(0, 2, "be"),
        }];
        let store: GraphStore = vec![a.clone(), b].into_iter().collect();

        let tree = build_tree(&store, &[a]);
        let total: usize = tree.iter().map(TreeNode::subtree_len).sum();
        // A main, A segment, A after, B main, B segment, B after
        assert_eq!(total, 6);
    }
}
