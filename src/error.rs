use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the video-to-corpus pipeline and the script compiler.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot open video {path:?}: {message}")]
    StreamOpen { path: PathBuf, message: String },

    #[error("Failed to decode frame {frame}: {message}")]
    Decode { frame: usize, message: String },

    #[error("Missing dependencies: {}", .0.join(", "))]
    MissingDependency(Vec<String>),

    /// Only ever logged; the extractor records an empty path instead.
    #[error("Vectorization failed for frame {frame}: {message}")]
    Vectorization { frame: usize, message: String },

    #[error("Path corpus {path:?}: {message}")]
    Serialization { path: PathBuf, message: String },

    #[error("Invalid size format {0:?}. Use WIDTHxHEIGHT (e.g., 480x360)")]
    MalformedSizeSpec(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
