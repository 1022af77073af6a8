//! Collaborator traits for persistence and completion

mod file;
mod memory;

pub use file::FilePointBackend;
pub use memory::MemoryPointBackend;

use async_trait::async_trait;
use point_core::{Anchor, Message, ModelConfig, Point, Result};

use crate::context::TurnContext;

/// Persistence collaborator. Every mutating call returns the updated point
/// as stored by the backend.
#[async_trait]
pub trait PointBackend: Send + Sync {
    /// Create a point for `prompt` with no response yet. A point without a
    /// parent in `context` is created as a root.
    async fn create_point(&self, context: &TurnContext, prompt: &str) -> Result<Point>;

    /// Load a point, `Ok(None)` if it does not exist.
    async fn fetch_point(&self, id: &str) -> Result<Option<Point>>;

    /// Append `child_id` to the parent's regular children.
    async fn append_child(&self, parent_id: &str, child_id: &str) -> Result<Point>;

    /// Register `child_id` under the parent's shard for `anchor`, creating the
    /// shard if no shard has an identical anchor.
    async fn attach_shard(&self, parent_id: &str, anchor: &Anchor, child_id: &str)
        -> Result<Point>;

    /// Overwrite a point.
    async fn save_point(&self, point: &Point) -> Result<()>;
}

/// AI completion collaborator.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete the latest prompt of `point_id`, returning the point with its
    /// response populated.
    async fn complete_prompt(
        &self,
        point_id: &str,
        messages: &[Message],
        model: &ModelConfig,
    ) -> Result<Point>;
}

/// Build the point a backend should create for `context`.
pub(crate) fn new_point(id: String, context: &TurnContext, prompt: &str) -> Point {
    match context.parent_id() {
        Some(parent_id) => Point::child(id, parent_id, prompt),
        None => Point::root(id, prompt),
    }
}

/// Apply a shard attachment to a parent and, when present, its forked child.
pub(crate) fn apply_shard(
    parent: &Point,
    child: Option<&Point>,
    anchor: &Anchor,
    child_id: &str,
) -> (Point, Option<Point>) {
    let updated_parent = parent.with_shard_child(anchor, child_id);
    let updated_child = match (child, updated_parent.shard_for_child(child_id)) {
        (Some(child), Some(shard)) => Some(child.with_parent_shard(shard.shard_id.clone())),
        _ => None,
    };
    (updated_parent, updated_child)
}
