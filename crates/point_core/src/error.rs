//! Thread error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThreadError {
    #[error("Parent point not found: {0}")]
    ParentNotFound(String),

    #[error("Invalid anchor: start {start} is after end {end}")]
    InvalidAnchor { start: usize, end: usize },

    #[error("Point not found: {0}")]
    PointNotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ThreadError>;
