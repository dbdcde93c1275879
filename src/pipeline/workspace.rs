use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;

const PREFIX: &str = "bas_svg_animation_";

/// Scratch directory for one run, holding `bmp/` and `svg/`.
/// Removed on drop unless retention was requested.
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    keep: bool,
}

impl Workspace {
    pub fn create(keep: bool) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), keep)
    }

    pub fn create_in(parent: &Path, keep: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        let root = dir.path().to_path_buf();
        fs::create_dir(root.join("bmp"))?;
        fs::create_dir(root.join("svg"))?;
        info!("Working in temporary directory: {:?}", root);

        Ok(Self {
            dir: Some(dir),
            root,
            keep,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raster_dir(&self) -> PathBuf {
        self.root.join("bmp")
    }

    pub fn svg_dir(&self) -> PathBuf {
        self.root.join("svg")
    }

    pub fn keeps(&self) -> bool {
        self.keep
    }

    /// Number of SVG documents the tracer has produced so far.
    pub fn svg_count(&self) -> usize {
        WalkDir::new(self.svg_dir())
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "svg"))
            .count()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        if self.keep {
            let root = dir.keep();
            info!("Temporary files kept at: {:?}", root);
            info!(
                "Debug: Check {:?} for frames and {:?} for SVGs",
                root.join("bmp"),
                root.join("svg")
            );
        } else if let Err(e) = dir.close() {
            warn!("Failed to remove temporary directory {:?}: {}", self.root, e);
        } else {
            info!("Cleaned up temporary files");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() -> anyhow::Result<()> {
        let parent = tempfile::tempdir()?;
        let ws = Workspace::create_in(parent.path(), false)?;
        let root = ws.root().to_path_buf();
        assert!(ws.raster_dir().is_dir());
        assert!(ws.svg_dir().is_dir());
        assert!(root.file_name().unwrap().to_string_lossy().starts_with(PREFIX));

        drop(ws);
        assert!(!root.exists());
        Ok(())
    }

    #[test]
    fn test_kept_on_request() -> anyhow::Result<()> {
        let parent = tempfile::tempdir()?;
        let ws = Workspace::create_in(parent.path(), true)?;
        let root = ws.root().to_path_buf();
        fs::write(ws.svg_dir().join("frame_0000.svg"), "<svg/>")?;
        assert!(ws.keeps());

        drop(ws);
        assert!(root.join("svg/frame_0000.svg").exists());
        Ok(())
    }

    #[test]
    fn test_svg_count_ignores_other_files() -> anyhow::Result<()> {
        let parent = tempfile::tempdir()?;
        let ws = Workspace::create_in(parent.path(), false)?;
        fs::write(ws.svg_dir().join("frame_0000.svg"), "<svg/>")?;
        fs::write(ws.svg_dir().join("frame_0001.svg"), "<svg/>")?;
        fs::write(ws.svg_dir().join("notes.txt"), "")?;
        assert_eq!(ws.svg_count(), 2);
        Ok(())
    }

    #[test]
    fn test_removed_during_unwind() -> anyhow::Result<()> {
        let parent = tempfile::tempdir()?;
        let parent_path = parent.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let _ws = Workspace::create_in(&parent_path, false).unwrap();
            panic!("pipeline blew up");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(parent.path())?.count(), 0);
        Ok(())
    }
}
