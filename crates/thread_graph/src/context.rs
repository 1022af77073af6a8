//! Turn context and context-message assembly

use std::collections::HashSet;

use point_core::{Anchor, GraphStore, Message, Point, PointId, ShardId};
use serde::{Deserialize, Serialize};

/// Where a new turn attaches.
///
/// The parent is `parent_point_id` when set, else `current_point_id`; with
/// neither, the new point is a root. A turn forks a sub-prompt only when
/// `is_shard_child` is set and `selected_text` is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnContext {
    #[serde(default)]
    pub current_point_id: Option<PointId>,
    #[serde(default)]
    pub parent_point_id: Option<PointId>,
    #[serde(default)]
    pub parent_shard_id: Option<ShardId>,
    #[serde(default)]
    pub is_shard_child: bool,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub start_position: usize,
    #[serde(default)]
    pub end_position: usize,
}

impl TurnContext {
    /// Start a new conversation.
    pub fn root() -> Self {
        Self::default()
    }

    /// Continue the conversation at `current_point_id`.
    pub fn continuation(current_point_id: impl Into<String>) -> Self {
        Self {
            current_point_id: Some(current_point_id.into()),
            ..Self::default()
        }
    }

    /// Fork a sub-prompt from `anchor` inside `parent_point_id`'s response.
    pub fn fork(parent_point_id: impl Into<String>, anchor: Anchor) -> Self {
        let parent_point_id = parent_point_id.into();
        Self {
            current_point_id: Some(parent_point_id.clone()),
            parent_point_id: Some(parent_point_id),
            parent_shard_id: None,
            is_shard_child: true,
            selected_text: anchor.selected_text,
            start_position: anchor.start_position,
            end_position: anchor.end_position,
        }
    }

    pub fn with_parent_shard(mut self, shard_id: impl Into<String>) -> Self {
        self.parent_shard_id = Some(shard_id.into());
        self
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_point_id
            .as_deref()
            .or(self.current_point_id.as_deref())
    }

    pub fn is_fork(&self) -> bool {
        self.is_shard_child && !self.selected_text.is_empty()
    }

    pub fn anchor(&self) -> Anchor {
        Anchor::new(
            self.start_position,
            self.end_position,
            self.selected_text.clone(),
        )
    }
}

/// Messages sent to the completion service for `point`: every exchange on
/// the path from the root down to `point`, oldest first.
///
/// A point forked from a shard is preceded by a user message quoting the
/// selected text. The walk stops early, with a warning, at a missing parent,
/// a cycle, or after `max_depth` ancestors.
pub fn context_messages(store: &GraphStore, point: &Point, max_depth: usize) -> Vec<Message> {
    let mut chain: Vec<&Point> = vec![point];
    let mut visited: HashSet<&str> = HashSet::from([point.id.as_str()]);
    let mut current = point;

    while !current.is_root() {
        if chain.len() > max_depth {
            tracing::warn!(point_id = %point.id, max_depth, "Context walk hit depth limit");
            break;
        }
        let Some(parent) = store.get(&current.parent_point_id) else {
            tracing::warn!(
                point_id = %current.id,
                parent_id = %current.parent_point_id,
                "Context walk stopped at a parent missing from the store"
            );
            break;
        };
        if !visited.insert(parent.id.as_str()) {
            tracing::warn!(point_id = %parent.id, "Context walk found a cycle");
            break;
        }
        chain.push(parent);
        current = parent;
    }

    let mut messages = Vec::new();
    for point in chain.into_iter().rev() {
        if let Some(selected) = selected_text_for(store, point) {
            messages.push(Message::user(format!(
                "The next question is about this excerpt from the previous answer: \"{selected}\""
            )));
        }
        for exchange in &point.exchanges {
            messages.push(exchange.prompt.clone());
            if let Some(content) = exchange.response.as_ref().and_then(|r| r.content()) {
                messages.push(Message::assistant(content));
            }
        }
    }
    messages
}

fn selected_text_for<'a>(store: &'a GraphStore, point: &Point) -> Option<&'a str> {
    let shard_id = point.parent_shard_id.as_deref()?;
    let shard = store.get(&point.parent_point_id)?.shard(shard_id)?;
    Some(shard.anchor.selected_text.as_str()).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use point_core::{Response, Role};

    fn answered(point: Point, answer: &str) -> Point {
        point.with_response(Response::text(answer))
    }

    #[test]
    fn fork_requires_selected_text() {
        let mut context = TurnContext::fork("T001", Anchor::new(0, 3, "abc"));
        assert!(context.is_fork());
        assert_eq!(context.parent_id(), Some("T001"));

        context.selected_text.clear();
        assert!(!context.is_fork());
        assert!(!TurnContext::continuation("T001").is_fork());
    }

    #[test]
    fn parent_point_id_wins_over_current() {
        let context = TurnContext {
            current_point_id: Some("T005".into()),
            parent_point_id: Some("T001".into()),
            ..TurnContext::default()
        };
        assert_eq!(context.parent_id(), Some("T001"));
        assert_eq!(TurnContext::root().parent_id(), None);
    }

    #[test]
    fn messages_follow_the_ancestor_chain() {
        let root = answered(Point::root("T001", "What is Earth?"), "Third planet from the Sun")
            .with_child("T002");
        let next = answered(Point::child("T002", "T001", "How old is it?"), "4.5 billion years");
        let leaf = Point::child("T003", "T002", "And the Moon?");
        let store: GraphStore = vec![root, next, leaf.clone()].into_iter().collect();

        let messages = context_messages(&store, &leaf, 32);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "What is Earth?",
                "Third planet from the Sun",
                "How old is it?",
                "4.5 billion years",
                "And the Moon?",
            ]
        );
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn shard_child_gets_excerpt_note() {
        let root = answered(Point::root("T001", "What is Earth?"), "Third planet from the Sun")
            .with_shard_child(&Anchor::new(22, 25, "Sun"), "T002");
        let fork = Point::child("T002", "T001", "What is the Sun?").with_parent_shard("shard-1");
        let store: GraphStore = vec![root, fork.clone()].into_iter().collect();

        let messages = context_messages(&store, &fork, 32);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, Role::User);
        assert!(messages[2].content.contains("\"Sun\""));
        assert_eq!(messages[3].content, "What is the Sun?");
    }

    #[test]
    fn walk_stops_at_missing_parent_and_depth_limit() {
        let orphan = Point::child("T009", "T404", "lost?");
        let store: GraphStore = vec![orphan.clone()].into_iter().collect();
        assert_eq!(context_messages(&store, &orphan, 32).len(), 1);

        let a = Point::root("A", "a");
        let b = Point::child("B", "A", "b");
        let c = Point::child("C", "B", "c");
        let store: GraphStore = vec![a, b, c.clone()].into_iter().collect();
        assert_eq!(context_messages(&store, &c, 1).len(), 2);
    }
}
