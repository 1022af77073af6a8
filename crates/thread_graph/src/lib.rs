//! # Thread Graph
//!
//! Adds turns to a branching conversation. A new turn either continues its
//! parent point or forks a sub-prompt from an anchored region ("shard") of
//! the parent's response. Points are persisted through a [`PointBackend`]
//! and cached in a [`GraphStore`](point_core::GraphStore).

pub mod backend;
pub mod context;
pub mod events;
pub mod manager;
pub mod segmenter;

// Re-exports
pub use backend::{CompletionService, FilePointBackend, MemoryPointBackend, PointBackend};
pub use context::{context_messages, TurnContext};
pub use events::{GraphEvent, GraphEventBus};
pub use manager::ThreadGraphManager;
pub use segmenter::{resolve_shard_id, validate_anchor, ShardSegmenter};
