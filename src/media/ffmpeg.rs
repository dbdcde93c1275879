use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use image::{ImageBuffer, RgbImage};
use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::media::{FrameStream, StreamInfo, VideoDecoder};
use crate::utils::config::ToolPaths;
use crate::utils::process::tool_responds;

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Deserialize, Default)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Decodes video through `ffprobe` (metadata) and `ffmpeg` (raw RGB24 frames on stdout).
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegDecoder {
    pub fn new(tools: &ToolPaths) -> Self {
        Self {
            ffmpeg: tools.ffmpeg.clone(),
            ffprobe: tools.ffprobe.clone(),
        }
    }

    fn probe(&self, path: &Path) -> Result<StreamInfo> {
        let open_err = |message: String| PipelineError::StreamOpen {
            path: path.to_path_buf(),
            message,
        };

        let out = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0", "-print_format", "json"])
            .args(["-show_streams", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| open_err(format!("failed to run ffprobe: {}", e)))?;

        if !out.status.success() {
            return Err(open_err(String::from_utf8_lossy(&out.stderr).trim().to_string()));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| open_err(format!("ffprobe json parse failed: {}", e)))?;
        stream_info(parsed).map_err(open_err)
    }
}

fn stream_info(parsed: ProbeOut) -> std::result::Result<StreamInfo, String> {
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream found".to_string())?;

    let coded_width = stream.width.ok_or("missing video width")?;
    let coded_height = stream.height.ok_or("missing video height")?;
    if coded_width == 0 || coded_height == 0 {
        return Err(format!("invalid video dimensions {}x{}", coded_width, coded_height));
    }

    // ffmpeg applies the display rotation, so quarter turns swap the decoded frame size.
    let (width, height) = if quarter_turned(&stream) {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    // avg_frame_rate is what containers report as the playback rate; r_frame_rate is the fallback.
    let native_fps = [stream.avg_frame_rate.as_deref(), stream.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(parse_ratio)
        .find(|fps| *fps > 0.0)
        .ok_or("missing video frame rate")?;

    let duration_secs = stream
        .duration
        .as_deref()
        .or(parsed.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let total_frames = stream
        .nb_frames
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| (duration_secs * native_fps).round() as u64);

    Ok(StreamInfo {
        width,
        height,
        native_fps,
        total_frames,
        duration_secs,
    })
}

fn quarter_turned(stream: &ProbeStream) -> bool {
    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|side| side.rotation)
        .or_else(|| stream.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
        .unwrap_or(0.0);
    (rotation.round() as i64).rem_euclid(180) == 90
}

fn parse_ratio(raw: &str) -> Option<f64> {
    match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 { None } else { Some(num / den) }
        }
        None => raw.trim().parse().ok(),
    }
}

impl VideoDecoder for FfmpegDecoder {
    type Stream = FfmpegStream;

    fn missing_tools(&self) -> Vec<String> {
        [(&self.ffmpeg, "ffmpeg"), (&self.ffprobe, "ffprobe")]
            .into_iter()
            .filter(|(program, _)| !tool_responds(program, "-version"))
            .map(|(_, name)| name.to_string())
            .collect()
    }

    fn open(&self, path: &Path) -> Result<FfmpegStream> {
        let info = self.probe(path)?;
        debug!("ffprobe {:?}: {:?}", path, info);

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-map", "0:v:0"])
            // one output frame per decoded frame, never duplicated or dropped
            .args(["-fps_mode", "passthrough"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PipelineError::StreamOpen {
                path: path.to_path_buf(),
                message: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| PipelineError::StreamOpen {
            path: path.to_path_buf(),
            message: "failed to open ffmpeg stdout".to_string(),
        })?;

        let frame_len = info.width as usize * info.height as usize * 3;
        Ok(FfmpegStream {
            child,
            stdout: BufReader::with_capacity(frame_len.max(8192), stdout),
            info,
            frame_len,
            decoded: 0,
            finished: false,
        })
    }
}

/// One running `ffmpeg` process; killed when dropped.
pub struct FfmpegStream {
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: StreamInfo,
    frame_len: usize,
    decoded: usize,
    finished: bool,
}

impl FfmpegStream {
    fn decode_err(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::Decode {
            frame: self.decoded,
            message: message.into(),
        }
    }
}

impl FrameStream for FfmpegStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn read_next(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < self.frame_len {
            let n = self
                .stdout
                .read(&mut buffer[filled..])
                .map_err(|e| self.decode_err(format!("failed to read ffmpeg output: {}", e)))?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.finished = true;
            let status = self
                .child
                .wait()
                .map_err(|e| self.decode_err(format!("failed to wait on ffmpeg: {}", e)))?;
            if !status.success() {
                return Err(self.decode_err(format!("ffmpeg exited with {}", status)));
            }
            return Ok(None);
        }

        if filled < self.frame_len {
            self.finished = true;
            return Err(self.decode_err(format!(
                "truncated frame: got {} of {} bytes",
                filled, self.frame_len
            )));
        }

        let frame = ImageBuffer::from_raw(self.info.width, self.info.height, buffer)
            .ok_or_else(|| self.decode_err("frame buffer does not match video dimensions"))?;
        self.decoded += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(json: &str) -> std::result::Result<StreamInfo, String> {
        stream_info(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("30000/1001").map(|f| (f * 100.0).round()), Some(2997.0));
        assert_eq!(parse_ratio("25"), Some(25.0));
        assert_eq!(parse_ratio("0/0"), None);
        assert_eq!(parse_ratio("abc"), None);
    }

    #[test]
    fn test_stream_info_prefers_avg_frame_rate() {
        let info = probe(
            r#"{"streams":[{"width":640,"height":480,"avg_frame_rate":"24/1","r_frame_rate":"48/1","nb_frames":"240","duration":"10.0"}]}"#,
        )
        .unwrap();
        assert_eq!(info.native_fps, 24.0);
        assert_eq!(info.total_frames, 240);
        assert_eq!(info.duration_secs, 10.0);
    }

    #[test]
    fn test_stream_info_falls_back_to_format_duration() {
        let info = probe(
            r#"{"streams":[{"width":320,"height":240,"avg_frame_rate":"0/0","r_frame_rate":"30/1"}],"format":{"duration":"2.5"}}"#,
        )
        .unwrap();
        assert_eq!(info.native_fps, 30.0);
        assert_eq!(info.total_frames, 75);
    }

    #[test]
    fn test_stream_info_swaps_size_for_quarter_turns() {
        let rotated = r#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}]}"#;
        let info = probe(rotated).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let tagged = r#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1","tags":{"rotate":"270"}}]}"#;
        let info = probe(tagged).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));

        let upside_down = r#"{"streams":[{"width":1920,"height":1080,"avg_frame_rate":"30/1","tags":{"rotate":"180"}}]}"#;
        let info = probe(upside_down).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
    }

    #[test]
    fn test_stream_info_without_video_stream() {
        assert!(probe(r#"{"streams":[]}"#).is_err());
    }
}
