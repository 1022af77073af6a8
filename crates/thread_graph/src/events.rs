use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use point_core::{PointId, ShardId, ThreadConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Emitted after every committed change to the graph store. Subscribers
/// rebuild their flattened tree on receipt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    PointCreated {
        point_id: PointId,
        parent_point_id: PointId,
        at: DateTime<Utc>,
    },
    ChildAppended {
        parent_point_id: PointId,
        child_id: PointId,
        at: DateTime<Utc>,
    },
    ShardAttached {
        parent_point_id: PointId,
        shard_id: Option<ShardId>,
        child_id: PointId,
        at: DateTime<Utc>,
    },
    ResponseCompleted {
        point_id: PointId,
        at: DateTime<Utc>,
    },
}

impl GraphEvent {
    /// The point whose subtree changed.
    pub fn point_id(&self) -> &str {
        match self {
            GraphEvent::PointCreated { point_id, .. }
            | GraphEvent::ResponseCompleted { point_id, .. } => point_id,
            GraphEvent::ChildAppended { parent_point_id, .. }
            | GraphEvent::ShardAttached { parent_point_id, .. } => parent_point_id,
        }
    }
}

/// A bounded channel-based graph event bus
///
/// Uses `try_send` for non-blocking emission. If the channel is full,
/// events are dropped and counted in the `dropped` counter.
pub struct GraphEventBus {
    tx: mpsc::Sender<GraphEvent>,
    dropped: Arc<AtomicU64>,
}

impl GraphEventBus {
    /// Returns the bus (for emitting events) and the receiver (for consuming events)
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<GraphEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Bus sized by `event_capacity`.
    pub fn from_config(config: &ThreadConfig) -> (Self, mpsc::Receiver<GraphEvent>) {
        Self::new(config.event_capacity)
    }

    pub fn emit(&self, event: GraphEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped since the bus was created
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Clone for GraphEventBus {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}
