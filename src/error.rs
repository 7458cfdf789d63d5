//! Error types for the rendering pipelines and the preview server.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The math engine itself failed (not a formula parse error, those are
    /// rendered inline by the engine).
    #[error("Math rendering error: {0}")]
    Math(String),

    #[error("Syntax highlighting error: {0}")]
    Highlight(#[from] syntect::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Renderer panicked: {0}")]
    Panicked(String),
}
