pub mod workspace;

use std::path::{Path, PathBuf};
use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::corpus::PathCorpus;
use crate::error::{PipelineError, Result};
use crate::media::mimetype;
use crate::media::sampler::{FrameSampler, SamplerConfig};
use crate::media::VideoDecoder;
use crate::vector::extract::VectorExtractor;
use crate::vector::{TraceParams, Vectorizer};
use workspace::Workspace;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub sampler: SamplerConfig,
    pub trace: TraceParams,
    pub keep_temp: bool,
    /// Where the workspace is created; the system temp dir when `None`.
    pub temp_parent: Option<PathBuf>,
}

/// Outcome of one video-to-corpus run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub frames: usize,
    pub svg_files: usize,
    pub paths: usize,
    pub empty_paths: usize,
    pub native_fps: f64,
    pub estimated_duration_secs: f64,
    pub output: PathBuf,
    pub retained_workspace: Option<PathBuf>,
}

/// Video -> binarized frames -> traced paths -> corpus file.
pub struct Pipeline<D: VideoDecoder, V: Vectorizer> {
    decoder: D,
    vectorizer: V,
    progress: ProgressBar,
}

impl<D: VideoDecoder, V: Vectorizer> Pipeline<D, V> {
    pub fn new(decoder: D, vectorizer: V) -> Self {
        Self {
            decoder,
            vectorizer,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fails with every absent collaborator named at once.
    pub fn check_dependencies(&self) -> Result<()> {
        let mut missing = self.decoder.missing_tools();
        missing.extend(self.vectorizer.missing_tools());
        if missing.is_empty() {
            info!("All external tools are available");
            Ok(())
        } else {
            Err(PipelineError::MissingDependency(missing))
        }
    }

    /// Runs the whole conversion. The progress display is cleared on every failure.
    pub fn run(&self, input: &Path, output: &Path, options: &PipelineOptions) -> Result<PipelineReport> {
        let result = self.convert(input, output, options);
        if result.is_err() {
            self.progress.finish_and_clear();
        }
        result
    }

    fn convert(&self, input: &Path, output: &Path, options: &PipelineOptions) -> Result<PipelineReport> {
        self.check_dependencies()?;
        validate(&options.sampler)?;

        let mime = mimetype::detect_mimetype(input)?;
        if !mimetype::is_video(&mime) {
            warn!("{:?} looks like {}, not a video; trying anyway", input, mime);
        }

        info!(
            "Converting {:?} at {}fps, {}x{}",
            input, options.sampler.fps, options.sampler.width, options.sampler.height
        );

        let workspace = match &options.temp_parent {
            Some(parent) => Workspace::create_in(parent, options.keep_temp)?,
            None => Workspace::create(options.keep_temp)?,
        };

        let result = self.process(input, output, options, &workspace);
        if let Err(e) = &result {
            error!("Error during processing: {}", e);
        }
        result
        // workspace dropped here: removed, or kept and logged
    }

    fn process(
        &self,
        input: &Path,
        output: &Path,
        options: &PipelineOptions,
        workspace: &Workspace,
    ) -> Result<PipelineReport> {
        let stream = self.decoder.open(input)?;
        let mut sampler = FrameSampler::new(stream, options.sampler);
        let native_fps = sampler.info().native_fps;

        let raster_dir = workspace.raster_dir();
        let svg_dir = workspace.svg_dir();
        let mut extractor =
            VectorExtractor::new(&self.vectorizer, options.trace.clone(), &raster_dir, &svg_dir)
                .with_progress(self.progress.clone());

        let mut corpus = PathCorpus::new();
        let mut decode_failure = None;
        for frame in sampler.by_ref() {
            match frame {
                Ok(frame) => corpus.push(extractor.extract(&frame))?,
                Err(e) => {
                    decode_failure = Some(e);
                    break;
                }
            }
        }
        let frames = extractor.finish();
        if corpus.is_empty() && decode_failure.is_none() {
            warn!("No frames were extracted from {:?}", input);
        }

        // Frames traced before a decode failure are still worth keeping.
        corpus.save(output)?;
        info!("Saved {} path data entries to {:?}", corpus.len(), output);
        if let Some(e) = decode_failure {
            return Err(e);
        }

        let report = PipelineReport {
            frames,
            svg_files: workspace.svg_count(),
            paths: corpus.len(),
            empty_paths: corpus.empty_count(),
            native_fps,
            estimated_duration_secs: frames as f64 / options.sampler.fps as f64,
            output: std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf()),
            retained_workspace: workspace.keeps().then(|| workspace.root().to_path_buf()),
        };

        info!("Processed {} frames at {}fps", report.frames, options.sampler.fps);
        info!("Generated {} SVG files", report.svg_files);
        info!(
            "Extracted {} path data entries ({} empty)",
            report.paths, report.empty_paths
        );
        info!("Estimated playback duration: {:.1}s", report.estimated_duration_secs);
        info!("Output saved to: {:?}", report.output);
        Ok(report)
    }
}

fn validate(config: &SamplerConfig) -> Result<()> {
    if config.fps == 0 {
        return Err(PipelineError::InvalidArgument("fps must be positive".into()));
    }
    if config.width == 0 || config.height == 0 {
        return Err(PipelineError::InvalidArgument(format!(
            "output size must be non-zero, got {}x{}",
            config.width, config.height
        )));
    }
    Ok(())
}

/// Parses `WIDTHxHEIGHT`, e.g. `480x360`.
pub fn parse_size(spec: &str) -> Result<(u32, u32)> {
    let malformed = || PipelineError::MalformedSizeSpec(spec.to_string());
    let (w, h) = spec.trim().split_once(['x', 'X']).ok_or_else(malformed)?;
    let width: u32 = w.trim().parse().map_err(|_| malformed())?;
    let height: u32 = h.trim().parse().map_err(|_| malformed())?;
    if width == 0 || height == 0 {
        return Err(malformed());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::media::sampler::tests::FakeStream;
    use crate::vector::extract::tests::FakeTracer;

    struct FakeDecoder {
        native_fps: f64,
        frames: usize,
        fail_at: Option<usize>,
        missing: Vec<String>,
    }

    impl FakeDecoder {
        fn new(native_fps: f64, frames: usize) -> Self {
            Self { native_fps, frames, fail_at: None, missing: Vec::new() }
        }
    }

    impl VideoDecoder for FakeDecoder {
        type Stream = FakeStream;

        fn missing_tools(&self) -> Vec<String> {
            self.missing.clone()
        }

        fn open(&self, _path: &Path) -> Result<FakeStream> {
            let mut stream = FakeStream::new(self.native_fps, self.frames);
            stream.fail_at = self.fail_at;
            Ok(stream)
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        input: PathBuf,
        output: PathBuf,
    }

    impl Fixture {
        fn new() -> anyhow::Result<Self> {
            let dir = tempfile::tempdir()?;
            let input = dir.path().join("input.mp4");
            fs::write(&input, b"not really a video")?;
            let output = dir.path().join("pathdata.json");
            fs::create_dir(dir.path().join("tmp"))?;
            Ok(Self { dir, input, output })
        }

        fn options(&self, keep_temp: bool) -> PipelineOptions {
            PipelineOptions {
                sampler: SamplerConfig { fps: 5, width: 8, height: 6 },
                trace: TraceParams::default(),
                keep_temp,
                temp_parent: Some(self.dir.path().join("tmp")),
            }
        }

        fn leftover_workspaces(&self) -> usize {
            fs::read_dir(self.dir.path().join("tmp")).unwrap().count()
        }
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("480x360").unwrap(), (480, 360));
        assert_eq!(parse_size(" 640X480 ").unwrap(), (640, 480));
        for bad in ["480", "480x", "x360", "axb", "0x360", "480x-1", "480*360", ""] {
            assert!(
                matches!(parse_size(bad), Err(PipelineError::MalformedSizeSpec(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_run_writes_corpus_and_cleans_up() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let tracer = FakeTracer { fail_on: vec![2], ..FakeTracer::new() };
        let pipeline = Pipeline::new(FakeDecoder::new(25.0, 25), tracer);

        let report = pipeline.run(&fx.input, &fx.output, &fx.options(false))?;
        // interval 5 over 25 decoded frames
        assert_eq!(report.frames, 5);
        assert_eq!(report.paths, 5);
        assert_eq!(report.empty_paths, 1);
        assert_eq!(report.svg_files, 4);
        assert_eq!(report.estimated_duration_secs, 1.0);
        assert_eq!(report.retained_workspace, None);

        let corpus = PathCorpus::load(&fx.output)?;
        assert_eq!(corpus.paths(), ["M0 0", "M1 1", "", "M3 3", "M4 4"]);
        assert_eq!(fx.leftover_workspaces(), 0);
        Ok(())
    }

    #[test]
    fn test_keep_temp_retains_workspace() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let pipeline = Pipeline::new(FakeDecoder::new(5.0, 3), FakeTracer::new());

        let report = pipeline.run(&fx.input, &fx.output, &fx.options(true))?;
        let kept = report.retained_workspace.expect("workspace should be kept");
        assert!(kept.join("bmp/frame_0002.bmp").exists());
        assert!(kept.join("svg/frame_0002.svg").exists());
        assert_eq!(fx.leftover_workspaces(), 1);
        Ok(())
    }

    #[test]
    fn test_missing_dependencies_fail_before_any_work() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let mut decoder = FakeDecoder::new(25.0, 10);
        decoder.missing = vec!["ffprobe".into()];
        let tracer = FakeTracer { missing: vec!["potrace".into()], ..FakeTracer::new() };
        let pipeline = Pipeline::new(decoder, tracer);

        let err = pipeline.run(&fx.input, &fx.output, &fx.options(false)).unwrap_err();
        match err {
            PipelineError::MissingDependency(tools) => assert_eq!(tools, ["ffprobe", "potrace"]),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!fx.output.exists());
        assert_eq!(fx.leftover_workspaces(), 0);
        Ok(())
    }

    #[test]
    fn test_failed_run_clears_progress() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let mut decoder = FakeDecoder::new(25.0, 10);
        decoder.missing = vec!["ffmpeg".into()];
        let progress = ProgressBar::hidden();
        let pipeline = Pipeline::new(decoder, FakeTracer::new()).with_progress(progress.clone());

        assert!(pipeline.run(&fx.input, &fx.output, &fx.options(false)).is_err());
        assert!(progress.is_finished());
        Ok(())
    }

    #[test]
    fn test_missing_input_is_stream_open_error() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let pipeline = Pipeline::new(FakeDecoder::new(25.0, 10), FakeTracer::new());

        let err = pipeline
            .run(&fx.dir.path().join("absent.mp4"), &fx.output, &fx.options(false))
            .unwrap_err();
        assert!(matches!(err, PipelineError::StreamOpen { .. }));
        Ok(())
    }

    #[test]
    fn test_decode_error_keeps_partial_corpus_and_cleans_up() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let mut decoder = FakeDecoder::new(10.0, 20);
        decoder.fail_at = Some(5);
        let pipeline = Pipeline::new(decoder, FakeTracer::new());

        let err = pipeline.run(&fx.input, &fx.output, &fx.options(false)).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { frame: 5, .. }));

        // decoded 0, 2, 4 were kept before the failure
        let corpus = PathCorpus::load(&fx.output)?;
        assert_eq!(corpus.paths(), ["M0 0", "M1 1", "M2 2"]);
        assert_eq!(fx.leftover_workspaces(), 0);
        Ok(())
    }

    #[test]
    fn test_zero_fps_is_rejected() -> anyhow::Result<()> {
        let fx = Fixture::new()?;
        let pipeline = Pipeline::new(FakeDecoder::new(25.0, 10), FakeTracer::new());
        let mut options = fx.options(false);
        options.sampler.fps = 0;

        let err = pipeline.run(&fx.input, &fx.output, &options).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
        Ok(())
    }
}
