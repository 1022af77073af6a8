//! point_core - Core types for branching conversation threads
//!
//! This crate provides the foundational types used by the graph and tree crates:
//! - `point` - Point, Shard, Anchor and Exchange
//! - `store` - GraphStore, the in-process `id -> Point` cache
//! - `error` - ThreadError and the crate-wide Result alias
//! - `config` - ThreadConfig and ModelConfig

pub mod config;
pub mod error;
pub mod point;
pub mod store;
pub mod text;

// Re-export commonly used types
pub use config::{ModelConfig, ThreadConfig};
pub use error::{Result, ThreadError};
pub use point::{Anchor, Exchange, Message, Point, PointId, Response, Role, Shard, ShardId};
pub use store::GraphStore;
