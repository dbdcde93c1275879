use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use tracing::info;

const FFMPEG_KEY: &str = "FFMPEG_PATH";
const FFPROBE_KEY: &str = "FFPROBE_PATH";
const POTRACE_KEY: &str = "POTRACE_PATH";

/// Locations of the external tools the pipeline shells out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub potrace: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            potrace: PathBuf::from("potrace"),
        }
    }
}

/// Main entry point to get tool paths.
/// `.env` in the working directory wins, then the process environment, then bare names on PATH.
pub fn get_tool_paths() -> Result<ToolPaths> {
    let env_path = Path::new(".env");

    let mut paths = ToolPaths::default();
    apply_env_vars(&mut paths, |key| std::env::var(key).ok());

    if env_path.exists() {
        load_from_env(env_path, &mut paths)?;
        info!("Loaded tool paths from .env");
    }

    Ok(paths)
}

fn apply_env_vars(paths: &mut ToolPaths, lookup: impl Fn(&str) -> Option<String>) {
    for (key, slot) in [
        (FFMPEG_KEY, &mut paths.ffmpeg),
        (FFPROBE_KEY, &mut paths.ffprobe),
        (POTRACE_KEY, &mut paths.potrace),
    ] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            *slot = PathBuf::from(value.trim());
        }
    }
}

fn load_from_env(path: &Path, paths: &mut ToolPaths) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    apply_env_vars(paths, |key| {
        entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    });
    Ok(())
}
