use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::vector::extract::PathRecord;

/// Per-frame path strings in sampling order; the position is the frame index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathCorpus {
    paths: Vec<String>,
}

impl PathCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Its index must be the next position, so the corpus never has gaps.
    pub fn push(&mut self, record: PathRecord) -> Result<()> {
        if record.index != self.paths.len() {
            return Err(PipelineError::InvalidArgument(format!(
                "path record {} out of order, expected index {}",
                record.index,
                self.paths.len()
            )));
        }
        self.paths.push(record.path);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Frames that traced to nothing.
    pub fn empty_count(&self) -> usize {
        self.paths.iter().filter(|p| p.is_empty()).count()
    }

    pub fn records(&self) -> impl Iterator<Item = PathRecord> + '_ {
        self.paths.iter().enumerate().map(|(index, path)| PathRecord {
            index,
            path: path.clone(),
        })
    }

    /// Compact JSON array of strings.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialization_err = |message: String| PipelineError::Serialization {
            path: path.to_path_buf(),
            message,
        };

        let json = self.to_json().map_err(|e| serialization_err(e.to_string()))?;
        fs::write(path, json).map_err(|e| serialization_err(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let serialization_err = |message: String| PipelineError::Serialization {
            path: path.to_path_buf(),
            message,
        };

        let json = fs::read_to_string(path).map_err(|e| serialization_err(e.to_string()))?;
        Self::from_json(&json).map_err(|e| serialization_err(e.to_string()))
    }
}

impl From<Vec<String>> for PathCorpus {
    fn from(paths: Vec<String>) -> Self {
        Self { paths }
    }
}

impl FromIterator<String> for PathCorpus {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}
