use image::GrayImage;
use tracing::info;

use crate::error::Result;
use crate::media::raster;
use crate::media::FrameStream;

/// One sampled, binarized frame. `index` is its position in sampling order.
pub struct Frame {
    pub index: usize,
    pub raster: GrayImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

/// Keep every n-th decoded frame, n = floor(native / target), at least 1.
pub fn decimation_interval(native_fps: f64, fps: u32) -> usize {
    let ratio = (native_fps / fps as f64).floor();
    if ratio.is_finite() && ratio >= 1.0 {
        ratio as usize
    } else {
        1
    }
}

/// Lazily decimates and binarizes a decode stream. Fused after exhaustion or the first error.
pub struct FrameSampler<S: FrameStream> {
    stream: S,
    config: SamplerConfig,
    interval: usize,
    decoded: usize,
    emitted: usize,
    done: bool,
}

impl<S: FrameStream> FrameSampler<S> {
    pub fn new(stream: S, config: SamplerConfig) -> Self {
        let info = stream.info();
        let interval = decimation_interval(info.native_fps, config.fps);
        let target_frames = (info.duration_secs * config.fps as f64).floor() as u64;

        info!(
            "Video info: {:.2} fps, {} frames, {:.2}s",
            info.native_fps, info.total_frames, info.duration_secs
        );
        info!(
            "Extracting every {} frames, targeting {} frames at {} fps ({}x{})",
            interval, target_frames, config.fps, config.width, config.height
        );

        Self {
            stream,
            config,
            interval,
            decoded: 0,
            emitted: 0,
            done: false,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn info(&self) -> &crate::media::StreamInfo {
        self.stream.info()
    }

    /// Frames emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl<S: FrameStream> Iterator for FrameSampler<S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let decoded = match self.stream.read_next() {
                Ok(Some(decoded)) => decoded,
                Ok(None) => {
                    self.done = true;
                    info!("Extracted {} frames total", self.emitted);
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let keep = self.decoded % self.interval == 0;
            self.decoded += 1;
            if !keep {
                continue;
            }

            let frame = Frame {
                index: self.emitted,
                raster: raster::binarize(&decoded, self.config.width, self.config.height),
            };
            self.emitted += 1;
            if self.emitted % 50 == 0 {
                info!("Extracted {} frames...", self.emitted);
            }
            return Some(Ok(frame));
        }
        None
    }
}
