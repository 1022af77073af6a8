use std::path::{Path, PathBuf};

use async_trait::async_trait;
use point_core::{Anchor, Point, Result, ThreadConfig, ThreadError};
use tokio::fs;
use uuid::Uuid;

use super::{apply_shard, new_point, PointBackend};
use crate::context::TurnContext;

/// File-based backend storing one JSON document per point.
#[derive(Debug, Clone)]
pub struct FilePointBackend {
    base_path: PathBuf,
}

impl FilePointBackend {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Backend rooted at the configured points directory.
    pub fn from_config(config: &ThreadConfig) -> Self {
        Self::new(config.points_dir())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// File for `id`. Ids that could resolve outside `base_path` are rejected.
    fn point_path(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id == "." || id.contains("..") || id.contains(['/', '\\']) {
            tracing::warn!(point_id = id, "FilePointBackend: rejecting unsafe point id");
            return Err(ThreadError::Backend(format!("invalid point id: {id:?}")));
        }
        Ok(self.base_path.join(format!("{}.json", id)))
    }

    async fn read(&self, id: &str) -> Result<Option<Point>> {
        let path = self.point_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn write(&self, point: &Point) -> Result<()> {
        let path = self.point_path(&point.id)?;
        fs::create_dir_all(&self.base_path).await?;
        let contents = serde_json::to_string_pretty(point)?;
        fs::write(path, contents).await?;
        Ok(())
    }

    async fn read_existing(&self, id: &str) -> Result<Point> {
        self.read(id)
            .await?
            .ok_or_else(|| ThreadError::PointNotFound(id.to_string()))
    }
}

#[async_trait]
impl PointBackend for FilePointBackend {
    async fn create_point(&self, context: &TurnContext, prompt: &str) -> Result<Point> {
        let point = new_point(Uuid::new_v4().to_string(), context, prompt);
        self.write(&point).await?;
        tracing::debug!(point_id = %point.id, path = %self.base_path.display(), "FilePointBackend: created point");
        Ok(point)
    }

    async fn fetch_point(&self, id: &str) -> Result<Option<Point>> {
        self.read(id).await
    }

    async fn append_child(&self, parent_id: &str, child_id: &str) -> Result<Point> {
        let updated = self.read_existing(parent_id).await?.with_child(child_id);
        self.write(&updated).await?;
        Ok(updated)
    }

    async fn attach_shard(
        &self,
        parent_id: &str,
        anchor: &Anchor,
        child_id: &str,
    ) -> Result<Point> {
        let parent = self.read_existing(parent_id).await?;
        let child = self.read(child_id).await?;
        let (updated_parent, updated_child) = apply_shard(&parent, child.as_ref(), anchor, child_id);
        if let Some(child) = updated_child {
            self.write(&child).await?;
        }
        self.write(&updated_parent).await?;
        Ok(updated_parent)
    }

    async fn save_point(&self, point: &Point) -> Result<()> {
        self.write(point).await
    }
}
