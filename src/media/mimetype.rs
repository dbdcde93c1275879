use std::path::Path;

use crate::error::{PipelineError, Result};

/// Sniffs the input file's MIME type. A missing or unreadable file is a stream-open failure.
pub fn detect_mimetype(path: &Path) -> Result<String> {
    let kind = infer::get_from_path(path).map_err(|e| PipelineError::StreamOpen {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match kind {
        Some(k) => Ok(k.mime_type().to_string()),
        None => Ok("application/octet-stream".to_string()),
    }
}

pub fn is_video(mime: &str) -> bool {
    mime.starts_with("video/")
}
