pub mod extract;
pub mod potrace;
pub mod svg;

use std::fmt;
use std::path::Path;
use clap::ValueEnum;

/// How the tracer resolves ambiguous turns in the bitmap outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TurnPolicy {
    Black,
    White,
    Left,
    Right,
    Minority,
    Majority,
    Random,
}

impl fmt::Display for TurnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPolicy::Black => "black",
            TurnPolicy::White => "white",
            TurnPolicy::Left => "left",
            TurnPolicy::Right => "right",
            TurnPolicy::Minority => "minority",
            TurnPolicy::Majority => "majority",
            TurnPolicy::Random => "random",
        };
        f.write_str(name)
    }
}

/// Parameters forwarded to the tracer. Tuned for few path elements.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceParams {
    /// Output document width in points.
    pub target_width: u32,
    /// Output document height in points.
    pub target_height: u32,
    pub opt_tolerance: f64,
    pub turn_policy: TurnPolicy,
    /// Emit straight segments instead of curves.
    pub flat: bool,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            target_width: 4800,
            target_height: 3600,
            opt_tolerance: 0.8,
            turn_policy: TurnPolicy::Majority,
            flat: true,
        }
    }
}

/// External raster-to-vector collaborator.
pub trait Vectorizer {
    /// Names of the external tools this vectorizer needs that are not installed.
    fn missing_tools(&self) -> Vec<String>;

    /// Traces the bitmap at `raster` into an SVG document at `output`.
    fn trace(&self, raster: &Path, output: &Path, params: &TraceParams) -> anyhow::Result<()>;
}
