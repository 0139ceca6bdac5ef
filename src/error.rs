use std::path::PathBuf;

use thiserror::Error;

/// Main error type for calltrace operations
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid max depth {0}: must not be negative")]
    InvalidDepth(i64),

    #[error("Cannot open diagram output {path}: {source}")]
    OutputTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed signature '{0}'")]
    Signature(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Rasterizer error: {0}")]
    Rasterizer(String),

    #[error("Script error at line {line}: {message}")]
    Script { line: usize, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
