use std::collections::HashMap;

use async_trait::async_trait;
use point_core::{Anchor, Point, Result, ThreadError};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{apply_shard, new_point, PointBackend};
use crate::context::TurnContext;

/// In-memory backend, mainly for tests and offline use.
#[derive(Default)]
pub struct MemoryPointBackend {
    points: RwLock<HashMap<String, Point>>,
}

impl MemoryPointBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(points: impl IntoIterator<Item = Point>) -> Self {
        let points = points
            .into_iter()
            .map(|point| (point.id.clone(), point))
            .collect();
        Self {
            points: RwLock::new(points),
        }
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[async_trait]
impl PointBackend for MemoryPointBackend {
    async fn create_point(&self, context: &TurnContext, prompt: &str) -> Result<Point> {
        let point = new_point(Uuid::new_v4().to_string(), context, prompt);
        self.points
            .write()
            .await
            .insert(point.id.clone(), point.clone());
        Ok(point)
    }

    async fn fetch_point(&self, id: &str) -> Result<Option<Point>> {
        Ok(self.points.read().await.get(id).cloned())
    }

    async fn append_child(&self, parent_id: &str, child_id: &str) -> Result<Point> {
        let mut points = self.points.write().await;
        let parent = points
            .get(parent_id)
            .ok_or_else(|| ThreadError::PointNotFound(parent_id.to_string()))?;
        let updated = parent.with_child(child_id);
        points.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn attach_shard(
        &self,
        parent_id: &str,
        anchor: &Anchor,
        child_id: &str,
    ) -> Result<Point> {
        let mut points = self.points.write().await;
        let parent = points
            .get(parent_id)
            .ok_or_else(|| ThreadError::PointNotFound(parent_id.to_string()))?;
        let (updated_parent, updated_child) =
            apply_shard(parent, points.get(child_id), anchor, child_id);
        if let Some(child) = updated_child {
            points.insert(child.id.clone(), child);
        }
        points.insert(updated_parent.id.clone(), updated_parent.clone());
        Ok(updated_parent)
    }

    async fn save_point(&self, point: &Point) -> Result<()> {
        self.points
            .write()
            .await
            .insert(point.id.clone(), point.clone());
        Ok(())
    }
}
