//! Thread Graph Manager - decides root, continuation or shard fork for each turn

use std::sync::Arc;

use chrono::Utc;
use point_core::{GraphStore, Point, Result, ShardId, ThreadConfig, ThreadError};

use crate::backend::{CompletionService, PointBackend};
use crate::context::{context_messages, TurnContext};
use crate::events::{GraphEvent, GraphEventBus};
use crate::segmenter::{resolve_shard_id, ShardSegmenter};

/// Owns the graph store and applies each turn's read-modify-write sequence.
///
/// Turns take `&mut self`, so turns on one manager are serialized and two
/// turns can never both read the same pre-update parent.
pub struct ThreadGraphManager<B: PointBackend> {
    backend: Arc<B>,
    segmenter: ShardSegmenter<B>,
    completion: Option<Arc<dyn CompletionService>>,
    store: GraphStore,
    config: ThreadConfig,
    events: Option<GraphEventBus>,
}

impl<B: PointBackend> ThreadGraphManager<B> {
    pub fn new(backend: B, config: ThreadConfig) -> Self {
        let backend = Arc::new(backend);
        Self {
            segmenter: ShardSegmenter::new(Arc::clone(&backend)),
            backend,
            completion: None,
            store: GraphStore::new(),
            config,
            events: None,
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_events(mut self, events: GraphEventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    /// Add a turn for `prompt`, continuing or forking according to `context`.
    ///
    /// Backend failures propagate unchanged and leave the store untouched for
    /// the failing step.
    pub async fn add_turn(&mut self, prompt: &str, context: &TurnContext) -> Result<Point> {
        let new_point = self.backend.create_point(context, prompt).await?;
        tracing::debug!(
            point_id = %new_point.id,
            parent_id = %new_point.parent_point_id,
            is_fork = context.is_fork(),
            "ThreadGraphManager: created point"
        );

        if new_point.is_root() {
            self.store.put(new_point.clone());
            self.emit(GraphEvent::PointCreated {
                point_id: new_point.id.clone(),
                parent_point_id: new_point.parent_point_id.clone(),
                at: Utc::now(),
            });
            tracing::info!(point_id = %new_point.id, "ThreadGraphManager: new root point");
            return Ok(new_point);
        }

        let parent = self.resolve_parent(&new_point.parent_point_id).await?;

        if context.is_fork() {
            self.fork_turn(parent, new_point, context).await
        } else {
            self.continue_turn(parent, new_point).await
        }
    }

    async fn fork_turn(
        &mut self,
        parent: Point,
        new_point: Point,
        context: &TurnContext,
    ) -> Result<Point> {
        let updated_parent = self
            .segmenter
            .attach_shard(&parent, &new_point.id, &context.anchor())
            .await?;

        let shard_id = resolve_shard_id(&updated_parent, &new_point.id)
            .or_else(|| shard_hint(&updated_parent, context));
        let new_point = match &shard_id {
            Some(shard_id) => new_point.with_parent_shard(shard_id.clone()),
            None => new_point,
        };

        self.store.put(updated_parent);
        self.store.put(new_point.clone());
        tracing::info!(
            point_id = %new_point.id,
            parent_id = %new_point.parent_point_id,
            shard_id = ?shard_id,
            "ThreadGraphManager: forked sub-prompt"
        );
        self.emit_created(&new_point);
        self.emit(GraphEvent::ShardAttached {
            parent_point_id: new_point.parent_point_id.clone(),
            shard_id,
            child_id: new_point.id.clone(),
            at: Utc::now(),
        });
        Ok(new_point)
    }

    async fn continue_turn(&mut self, parent: Point, new_point: Point) -> Result<Point> {
        let updated_parent = self.backend.append_child(&parent.id, &new_point.id).await?;

        self.store.put(updated_parent);
        self.store.put(new_point.clone());
        tracing::info!(
            point_id = %new_point.id,
            parent_id = %new_point.parent_point_id,
            "ThreadGraphManager: continued thread"
        );
        self.emit_created(&new_point);
        self.emit(GraphEvent::ChildAppended {
            parent_point_id: new_point.parent_point_id.clone(),
            child_id: new_point.id.clone(),
            at: Utc::now(),
        });
        Ok(new_point)
    }

    /// Request a completion for the latest prompt of `point_id` and store the
    /// answered point.
    pub async fn complete_turn(&mut self, point_id: &str) -> Result<Point> {
        let completion = self
            .completion
            .clone()
            .ok_or_else(|| ThreadError::Completion("no completion service configured".into()))?;
        let point = self.load_point(point_id).await?;

        let messages = context_messages(&self.store, &point, self.config.max_context_depth);
        tracing::debug!(
            point_id,
            message_count = messages.len(),
            model = %self.config.model.model,
            "ThreadGraphManager: requesting completion"
        );
        let completed = completion
            .complete_prompt(point_id, &messages, &self.config.model)
            .await?;

        let response = completed
            .exchanges
            .last()
            .and_then(|exchange| exchange.response.clone())
            .ok_or_else(|| {
                ThreadError::Completion(format!("completion for {point_id} returned no response"))
            })?;
        let answered = point.with_response(response);

        self.backend.save_point(&answered).await?;
        self.store.put(answered.clone());
        self.emit(GraphEvent::ResponseCompleted {
            point_id: answered.id.clone(),
            at: Utc::now(),
        });
        Ok(answered)
    }

    /// `add_turn` followed by `complete_turn`.
    pub async fn submit(&mut self, prompt: &str, context: &TurnContext) -> Result<Point> {
        let point = self.add_turn(prompt, context).await?;
        self.complete_turn(&point.id).await
    }

    /// Point from the store, fetching and caching it from the backend on a miss.
    pub async fn load_point(&mut self, id: &str) -> Result<Point> {
        if let Some(point) = self.store.get(id) {
            return Ok(point.clone());
        }
        let point = self
            .backend
            .fetch_point(id)
            .await?
            .ok_or_else(|| ThreadError::PointNotFound(id.to_string()))?;
        self.store.put(point.clone());
        Ok(point)
    }

    /// Shard of `parent` that `child_id` was forked from, used when preparing
    /// a further nested sub-prompt.
    pub fn resolve_shard_id_for_child(&self, parent: &Point, child_id: &str) -> Option<ShardId> {
        resolve_shard_id(parent, child_id)
    }

    async fn resolve_parent(&mut self, parent_id: &str) -> Result<Point> {
        if let Some(parent) = self.store.get(parent_id) {
            return Ok(parent.clone());
        }
        match self.backend.fetch_point(parent_id).await? {
            Some(parent) => {
                self.store.put(parent.clone());
                Ok(parent)
            }
            None => {
                tracing::warn!(parent_id, "ThreadGraphManager: parent not found");
                Err(ThreadError::ParentNotFound(parent_id.to_string()))
            }
        }
    }

    fn emit_created(&self, point: &Point) {
        self.emit(GraphEvent::PointCreated {
            point_id: point.id.clone(),
            parent_point_id: point.parent_point_id.clone(),
            at: Utc::now(),
        });
    }

    fn emit(&self, event: GraphEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

/// The caller's `parent_shard_id`, accepted only when `parent` holds that
/// shard with the same anchor as the fork.
fn shard_hint(parent: &Point, context: &TurnContext) -> Option<ShardId> {
    let shard_id = context.parent_shard_id.as_deref()?;
    let shard = parent.shard(shard_id)?;
    if shard.anchor != context.anchor() {
        tracing::debug!(
            parent_id = %parent.id,
            shard_id,
            "ThreadGraphManager: ignoring shard hint with a different anchor"
        );
        return None;
    }
    tracing::debug!(parent_id = %parent.id, shard_id, "ThreadGraphManager: using caller's shard hint");
    Some(shard.shard_id.clone())
}
