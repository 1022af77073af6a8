//! Shard creation on a parent point

use std::sync::Arc;

use point_core::{Anchor, Point, Result, ShardId, ThreadError};

use crate::backend::PointBackend;

/// Attaches forked points to anchored shards of their parent.
pub struct ShardSegmenter<B: PointBackend> {
    backend: Arc<B>,
}

impl<B: PointBackend> ShardSegmenter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Register `new_point_id` under the shard of `parent` matching `anchor`,
    /// creating the shard when no existing anchor is identical. Returns the
    /// parent as persisted by the backend.
    pub async fn attach_shard(
        &self,
        parent: &Point,
        new_point_id: &str,
        anchor: &Anchor,
    ) -> Result<Point> {
        validate_anchor(anchor)?;

        let reused = parent.shards.iter().any(|shard| &shard.anchor == anchor);
        tracing::debug!(
            parent_id = %parent.id,
            child_id = %new_point_id,
            start = anchor.start_position,
            end = anchor.end_position,
            reused,
            "ShardSegmenter: attaching child to shard"
        );

        self.backend
            .attach_shard(&parent.id, anchor, new_point_id)
            .await
    }
}

/// Reject anchors whose start lies after their end. Anchors are never clamped.
pub fn validate_anchor(anchor: &Anchor) -> Result<()> {
    if anchor.is_ordered() {
        Ok(())
    } else {
        Err(ThreadError::InvalidAnchor {
            start: anchor.start_position,
            end: anchor.end_position,
        })
    }
}

/// Id of the shard in `parent` whose children include `point_id`.
pub fn resolve_shard_id(parent: &Point, point_id: &str) -> Option<ShardId> {
    let shard_id = parent
        .shard_for_child(point_id)
        .map(|shard| shard.shard_id.clone());
    if shard_id.is_none() {
        tracing::warn!(parent_id = %parent.id, point_id, "No shard found for child");
    }
    shard_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryPointBackend;
    use point_core::Response;

    fn earth() -> Point {
        Point::root("T001", "What is Earth?").with_response(Response::text("Third planet from the Sun"))
    }

    #[test]
    fn validate_anchor_rejects_reversed_range() {
        assert!(validate_anchor(&Anchor::new(3, 3, "")).is_ok());
        let err = validate_anchor(&Anchor::new(30, 20, "x")).unwrap_err();
        assert!(matches!(err, ThreadError::InvalidAnchor { start: 30, end: 20 }));
    }

    #[tokio::test]
    async fn attach_creates_then_reuses_shard() {
        let backend = Arc::new(MemoryPointBackend::with_points(vec![earth()]));
        let segmenter = ShardSegmenter::new(backend.clone());
        let anchor = Anchor::new(22, 25, "Sun");

        let parent = segmenter.attach_shard(&earth(), "T002", &anchor).await.unwrap();
        assert_eq!(parent.shards.len(), 1);

        let parent = segmenter.attach_shard(&parent, "T003", &anchor).await.unwrap();
        assert_eq!(parent.shards.len(), 1);
        assert_eq!(parent.shards[0].children, vec!["T002", "T003"]);
        assert_eq!(resolve_shard_id(&parent, "T003").as_deref(), Some("shard-1"));
        assert_eq!(resolve_shard_id(&parent, "T404"), None);
    }

    #[tokio::test]
    async fn invalid_anchor_never_reaches_backend() {
        let backend = Arc::new(MemoryPointBackend::with_points(vec![earth()]));
        let segmenter = ShardSegmenter::new(backend.clone());

        let result = segmenter
            .attach_shard(&earth(), "T002", &Anchor::new(30, 20, "x"))
            .await;
        assert!(matches!(result, Err(ThreadError::InvalidAnchor { .. })));

        let stored = backend.fetch_point("T001").await.unwrap().unwrap();
        assert!(stored.shards.is_empty());
    }
}
