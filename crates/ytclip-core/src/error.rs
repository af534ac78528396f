//! Error types for ytclip-core

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, YtClipError>;

#[derive(Error, Debug)]
pub enum YtClipError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Extraction failed: {0}")]
    Runner(#[from] RunnerError),

    #[error("Relay failed: {0}")]
    Relay(#[from] RelayError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Source URL is required")]
    MissingSource,

    #[error("Clip start and end must be given together")]
    UnpairedBounds,

    #[error("Invalid time format: {0} (expected HH:MM:SS or seconds)")]
    BadTimecode(String),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("yt-dlp not found. Install with: brew install yt-dlp")]
    ToolUnavailable,

    #[error("Failed to start yt-dlp: {0}")]
    Spawn(std::io::Error),

    #[error("yt-dlp failed with exit code {code:?}: {stderr}")]
    ExecutionFailed { code: Option<i32>, stderr: String },

    #[error("yt-dlp reported success but produced no file at {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog is not configured")]
    Unconfigured,

    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Catalog returned an unexpected response: {0}")]
    Decode(String),

    #[error("Record {0} not found")]
    NotFound(i64),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
