/// What the `duration` field of a declare block means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationMode {
    /// `(index + 1) * frame_ms`: time elapsed since playback start at the end of the frame.
    /// Kept as-is for compatibility with existing players, even though a per-frame
    /// duration would be the intuitive reading.
    Cumulative,
    /// `frame_ms` for every frame.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One property per line inside the declare block.
    Multiline,
    /// The whole declare block on one line.
    Compact,
}

/// Which number follows the `p` in asset identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    OneBased,
    ZeroBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Frame count, rate and playback length.
    Detailed,
    /// Rate and frame interval only.
    Brief,
}

/// Everything that differs between the two script flavours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionPolicy {
    /// Also skip paths made only of whitespace, not just empty ones.
    pub skip_whitespace_only: bool,
    pub duration_mode: DurationMode,
    /// Reference viewBox width and height.
    pub viewport: (u32, u32),
    pub layout: Layout,
    pub numbering: Numbering,
    pub header: Header,
    /// Log a progress line every n emitted frames.
    pub progress_every: Option<usize>,
}

impl EmissionPolicy {
    pub fn verbose() -> Self {
        Self {
            skip_whitespace_only: true,
            duration_mode: DurationMode::Cumulative,
            viewport: (1200, 900),
            layout: Layout::Multiline,
            numbering: Numbering::OneBased,
            header: Header::Detailed,
            progress_every: Some(50),
        }
    }

    pub fn optimized() -> Self {
        Self {
            skip_whitespace_only: true,
            duration_mode: DurationMode::Flat,
            viewport: (4800, 3600),
            layout: Layout::Compact,
            numbering: Numbering::ZeroBased,
            header: Header::Brief,
            progress_every: None,
        }
    }

    pub fn asset_id(&self, index: usize) -> String {
        match self.numbering {
            Numbering::OneBased => format!("p{}", index + 1),
            Numbering::ZeroBased => format!("p{}", index),
        }
    }

    pub fn duration_ms(&self, index: usize, frame_ms: u64) -> u64 {
        match self.duration_mode {
            DurationMode::Cumulative => (index as u64 + 1) * frame_ms,
            DurationMode::Flat => frame_ms,
        }
    }

    /// Whether a frame with this path produces no statements.
    pub fn skips(&self, path: &str) -> bool {
        if self.skip_whitespace_only {
            path.trim().is_empty()
        } else {
            path.is_empty()
        }
    }
}
