//! Detector inputs and tunables.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DetectError;

/// User-facing detector configuration, typically read from `tsemver.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Regular expressions; top-level declarations whose name matches any of
    /// them are left out of the comparison on both sides.
    pub ignore_patterns: Vec<String>,
    /// Extra ambient type names accepted during reference resolution.
    pub globals: Vec<String>,
}

impl DetectorConfig {
    /// Compile `ignore_patterns`, failing on the first malformed expression.
    pub fn ignore_set(&self) -> Result<IgnoreSet, DetectError> {
        let patterns = self
            .ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    DetectError::Config(format!("invalid ignore pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IgnoreSet { patterns })
    }
}

/// Compiled form of [`DetectorConfig::ignore_patterns`].
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}

/// One side of a comparison: a definition file on disk, or inline content
/// under a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionFile {
    pub path: PathBuf,
    pub name: String,
    /// Inline text; when absent the file is read from `path`.
    #[serde(default)]
    pub content: Option<String>,
}

impl DefinitionFile {
    /// A file read from disk, named after its final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        DefinitionFile {
            path,
            name,
            content: None,
        }
    }

    /// In-memory content under a display name.
    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        DefinitionFile {
            path: PathBuf::from(&name),
            name,
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorOptions {
    pub previous: DefinitionFile,
    pub current: DefinitionFile,
    #[serde(default)]
    pub config: DetectorConfig,
}
