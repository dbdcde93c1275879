use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use anyhow::{Result, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use pathreel::media::ffmpeg::FfmpegDecoder;
use pathreel::media::sampler::SamplerConfig;
use pathreel::pipeline::{parse_size, Pipeline, PipelineOptions};
use pathreel::timeline::{EmissionPolicy, TimelineCompiler};
use pathreel::utils::config;
use pathreel::vector::potrace::Potrace;
use pathreel::vector::{TraceParams, TurnPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert video into vector path frames and timed BAS overlay scripts", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample a video, trace every frame and save the path corpus as JSON
    Vectorize {
        /// Input video file path
        input: PathBuf,

        /// Output JSON file path
        #[arg(short, long, default_value = "pathdata.json")]
        output: PathBuf,

        /// Output frame rate
        #[arg(long, default_value_t = 5)]
        fps: u32,

        /// Output size as WIDTHxHEIGHT
        #[arg(long, default_value = "480x360")]
        size: String,

        /// How the tracer resolves ambiguous turns
        #[arg(long, value_enum, default_value_t = TurnPolicy::Majority)]
        turn_policy: TurnPolicy,

        /// Keep temporary files for debugging
        #[arg(long)]
        keep_temp: bool,
    },

    /// Generate the overlay script from a saved path corpus
    Compile {
        /// Path corpus JSON produced by `vectorize`
        corpus: PathBuf,

        /// Output script path
        #[arg(short, long, default_value = "video.bas")]
        output: PathBuf,

        /// Playback frame rate
        #[arg(long, default_value_t = 5)]
        fps: u32,

        /// Only use the first N frames
        #[arg(long)]
        max_frames: Option<usize>,

        /// Compact one-line blocks with flat durations
        #[arg(long)]
        optimized: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let result = match args.command {
        Command::Vectorize { input, output, fps, size, turn_policy, keep_temp } => {
            vectorize(&input, &output, fps, &size, turn_policy, keep_temp)
        }
        Command::Compile { corpus, output, fps, max_frames, optimized } => {
            compile(&corpus, &output, fps, max_frames, optimized)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn vectorize(
    input: &Path,
    output: &Path,
    fps: u32,
    size: &str,
    turn_policy: TurnPolicy,
    keep_temp: bool,
) -> Result<()> {
    let (width, height) = parse_size(size)?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {:?}", input);
    }

    let tools = config::get_tool_paths().context("Failed to resolve tool paths")?;
    info!("Pathreel starting: {:?} -> {:?}", input, output);

    let options = PipelineOptions {
        sampler: SamplerConfig { fps, width, height },
        trace: TraceParams { turn_policy, ..TraceParams::default() },
        keep_temp,
        temp_parent: None,
    };

    let pipeline = Pipeline::new(FfmpegDecoder::new(&tools), Potrace::new(&tools))
        .with_progress(frame_counter());
    pipeline
        .run(input, output, &options)
        .with_context(|| format!("Failed to convert {:?}", input))?;

    info!("Conversion completed.");
    Ok(())
}

fn compile(
    corpus: &Path,
    output: &Path,
    fps: u32,
    max_frames: Option<usize>,
    optimized: bool,
) -> Result<()> {
    let policy = if optimized {
        EmissionPolicy::optimized()
    } else {
        EmissionPolicy::verbose()
    };

    let compiler = TimelineCompiler::new(fps, policy)?.with_max_frames(max_frames);
    let report = compiler
        .compile_file(corpus, output)
        .with_context(|| format!("Failed to compile {:?}", corpus))?;

    info!("Script written to {:?}", output);
    info!(
        "Frames: {} total, {} emitted, {} skipped",
        report.total_frames, report.emitted, report.skipped
    );
    info!("Frame rate: {}fps ({}ms/frame)", fps, report.frame_ms);
    info!("Playback duration: {:.1}s", report.duration_secs);
    info!("File size: {} characters", report.chars);
    if optimized {
        info!("Empty frame ratio: {:.1}%", report.skipped_percent());
    }
    Ok(())
}

fn frame_counter() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} frames traced [{elapsed}]") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
