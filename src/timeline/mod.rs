//! Turns a path corpus into a timed overlay script: one declare block per
//! non-empty frame, revealed at `index * frame_ms` for one frame interval.

pub mod policy;

use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::corpus::PathCorpus;
use crate::error::{PipelineError, Result};
pub use policy::{DurationMode, EmissionPolicy, Header, Layout, Numbering};

/// Highest rate that still leaves a whole millisecond per frame.
pub const MAX_FPS: u32 = 1000;

/// Timing of one emitted frame, derived from its index and the frame rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineStatement {
    pub index: usize,
    pub asset_id: String,
    pub path: String,
    pub start_ms: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompileReport {
    /// Frames in the corpus file.
    pub source_frames: usize,
    /// Frames considered after the optional cap.
    pub total_frames: usize,
    pub emitted: usize,
    pub skipped: usize,
    pub frame_ms: u64,
    pub duration_secs: f64,
    /// Length of the script in characters.
    pub chars: usize,
}

impl CompileReport {
    /// Share of frames that produced no statements, in percent.
    pub fn skipped_percent(&self) -> f64 {
        if self.total_frames == 0 {
            0.0
        } else {
            self.skipped as f64 / self.total_frames as f64 * 100.0
        }
    }
}

/// `floor(1000 / fps)`.
pub fn frame_interval_ms(fps: u32) -> Result<u64> {
    if fps == 0 || fps > MAX_FPS {
        return Err(PipelineError::InvalidArgument(format!(
            "fps must be between 1 and {}, got {}",
            MAX_FPS, fps
        )));
    }
    Ok(1000 / fps as u64)
}

pub fn escape_path(path: &str) -> String {
    path.replace('"', "\\\"")
}

/// Inverse of [`escape_path`] for paths without backslashes, which the path grammar never produces.
pub fn unescape_path(escaped: &str) -> String {
    escaped.replace("\\\"", "\"")
}

pub struct TimelineCompiler {
    fps: u32,
    frame_ms: u64,
    policy: EmissionPolicy,
    max_frames: Option<usize>,
}

impl TimelineCompiler {
    pub fn new(fps: u32, policy: EmissionPolicy) -> Result<Self> {
        Ok(Self {
            fps,
            frame_ms: frame_interval_ms(fps)?,
            policy,
            max_frames: None,
        })
    }

    /// Only the first `max_frames` frames of the corpus are considered.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn frame_ms(&self) -> u64 {
        self.frame_ms
    }

    fn frames<'c>(&self, corpus: &'c PathCorpus) -> &'c [String] {
        let paths = corpus.paths();
        match self.max_frames {
            Some(max) if max < paths.len() => &paths[..max],
            _ => paths,
        }
    }

    /// Statements for every non-skipped frame, in index order.
    pub fn statements(&self, corpus: &PathCorpus) -> Vec<TimelineStatement> {
        self.frames(corpus)
            .iter()
            .enumerate()
            .filter(|(_, path)| !self.policy.skips(path))
            .map(|(index, path)| TimelineStatement {
                index,
                asset_id: self.policy.asset_id(index),
                path: path.clone(),
                start_ms: index as u64 * self.frame_ms,
                duration_ms: self.policy.duration_ms(index, self.frame_ms),
            })
            .collect()
    }

    pub fn render(&self, corpus: &PathCorpus) -> (String, CompileReport) {
        let frames = self.frames(corpus);
        if frames.len() < corpus.len() {
            warn!(
                "Truncated to the first {} frames ({} in corpus)",
                frames.len(),
                corpus.len()
            );
        }

        let mut lines = self.header_lines(frames.len());
        let statements = self.statements(corpus);
        for (emitted, statement) in statements.iter().enumerate() {
            self.push_block(&mut lines, statement);

            if let Some(every) = self.policy.progress_every {
                if every > 0 && (emitted + 1) % every == 0 {
                    info!(
                        "Processed {} non-empty frames (source frame {})",
                        emitted + 1,
                        statement.index + 1
                    );
                }
            }
        }

        let text = lines.join("\n");
        let report = CompileReport {
            source_frames: corpus.len(),
            total_frames: frames.len(),
            emitted: statements.len(),
            skipped: frames.len() - statements.len(),
            frame_ms: self.frame_ms,
            duration_secs: frames.len() as f64 / self.fps as f64,
            chars: text.chars().count(),
        };
        (text, report)
    }

    /// Reads a corpus file and writes the script. Fails only on I/O or a malformed corpus.
    pub fn compile_file(&self, corpus_path: &Path, output: &Path) -> Result<CompileReport> {
        let corpus = PathCorpus::load(corpus_path)?;
        info!("Read {} frames from {:?}", corpus.len(), corpus_path);

        let (text, report) = self.render(&corpus);
        fs::write(output, text)?;
        Ok(report)
    }

    fn header_lines(&self, frame_count: usize) -> Vec<String> {
        match self.policy.header {
            Header::Detailed => vec![
                "// BAS video playback script".to_string(),
                format!("// Frames: {}", frame_count),
                format!("// Frame rate: {}fps", self.fps),
                format!("// Duration: {:.1}s", frame_count as f64 / self.fps as f64),
                String::new(),
            ],
            Header::Brief => vec![
                "// Optimized BAS video".to_string(),
                format!("// Frame rate: {}fps | Frame interval: {}ms", self.fps, self.frame_ms),
                String::new(),
            ],
        }
    }

    fn push_block(&self, lines: &mut Vec<String>, s: &TimelineStatement) {
        let d = escape_path(&s.path);
        let (vw, vh) = self.policy.viewport;
        let id = &s.asset_id;

        match self.policy.layout {
            Layout::Multiline => {
                lines.push(format!("let {} = path {{", id));
                lines.push(format!("    d = \"{}\"", d));
                lines.push(format!("    viewBox = \"0 0 {} {}\"", vw, vh));
                lines.push("    width = 100%".to_string());
                lines.push(format!("    duration = {}ms", s.duration_ms));
                lines.push("    alpha = 0".to_string());
                lines.push("}".to_string());
            }
            Layout::Compact => {
                lines.push(format!(
                    "let {} = path{{ d = \"{}\" viewBox = \"0 0 {} {}\" width = 100% duration = {}ms alpha = 0 }}",
                    id, d, vw, vh, s.duration_ms
                ));
            }
        }
        lines.push(format!("set {} {{}} {}ms", id, s.start_ms));
        lines.push(format!("then set {} {{alpha = 1}} 0ms", id));
        lines.push(String::new());
    }
}
