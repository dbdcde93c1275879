pub mod ffmpeg;
pub mod mimetype;
pub mod raster;
pub mod sampler;

use std::path::Path;
use image::RgbImage;
use crate::error::Result;

/// What the decoder reports about an opened video stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub native_fps: f64,
    pub total_frames: u64,
    pub duration_secs: f64,
}

/// A sequential, non-restartable reader over decoded frames.
pub trait FrameStream {
    fn info(&self) -> &StreamInfo;

    /// Returns `Ok(None)` once the stream is exhausted.
    fn read_next(&mut self) -> Result<Option<RgbImage>>;
}

/// External decode collaborator.
pub trait VideoDecoder {
    type Stream: FrameStream;

    /// Names of the external tools this decoder needs that are not installed.
    fn missing_tools(&self) -> Vec<String>;

    fn open(&self, path: &Path) -> Result<Self::Stream>;
}
