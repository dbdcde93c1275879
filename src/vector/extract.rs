use std::path::{Path, PathBuf};
use anyhow::Context;
use image::ImageFormat;
use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::media::sampler::Frame;
use crate::vector::svg;
use crate::vector::{TraceParams, Vectorizer};

/// One frame's outline. An empty `path` means nothing could be traced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRecord {
    pub index: usize,
    pub path: String,
}

/// Writes each frame as a bitmap, traces it and keeps the first path of the result.
pub struct VectorExtractor<'a, V: Vectorizer> {
    vectorizer: &'a V,
    params: TraceParams,
    raster_dir: PathBuf,
    svg_dir: PathBuf,
    progress: ProgressBar,
    processed: usize,
}

impl<'a, V: Vectorizer> VectorExtractor<'a, V> {
    pub fn new(vectorizer: &'a V, params: TraceParams, raster_dir: &Path, svg_dir: &Path) -> Self {
        Self {
            vectorizer,
            params,
            raster_dir: raster_dir.to_path_buf(),
            svg_dir: svg_dir.to_path_buf(),
            progress: ProgressBar::hidden(),
            processed: 0,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Never fails: a tracing failure is logged and recorded as an empty path.
    pub fn extract(&mut self, frame: &Frame) -> PathRecord {
        let path = match self.try_extract(frame) {
            Ok(path) => path,
            Err(e) => {
                let failure = PipelineError::Vectorization {
                    frame: frame.index,
                    message: format!("{:#}", e),
                };
                warn!("{}", failure);
                String::new()
            }
        };

        self.processed += 1;
        self.progress.inc(1);
        if self.processed % 50 == 0 {
            info!("Converted {} frames to SVG", self.processed);
        }

        PathRecord {
            index: frame.index,
            path,
        }
    }

    fn try_extract(&self, frame: &Frame) -> anyhow::Result<String> {
        let stem = format!("frame_{:04}", frame.index);
        let raster_path = self.raster_dir.join(format!("{}.bmp", stem));
        let svg_path = self.svg_dir.join(format!("{}.svg", stem));

        frame
            .raster
            .save_with_format(&raster_path, ImageFormat::Bmp)
            .with_context(|| format!("Failed to write bitmap {:?}", raster_path))?;
        self.vectorizer.trace(&raster_path, &svg_path, &self.params)?;
        svg::read_first_path(&svg_path)
    }

    pub fn finish(self) -> usize {
        self.progress.finish_and_clear();
        self.processed
    }
}
