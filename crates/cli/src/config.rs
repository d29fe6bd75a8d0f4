use std::path::{Path, PathBuf};

use tsemver_core::DetectorConfig;

/// File consulted when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "tsemver.toml";

/// Resolve the detector configuration.
///
/// An explicit path must exist. Without one, `tsemver.toml` in the working
/// directory is used when present, otherwise the defaults apply.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<DetectorConfig, String> {
    let path: PathBuf = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(DetectorConfig::default());
            }
            default
        }
    };
    read_config(&path)
}

fn read_config(path: &Path) -> Result<DetectorConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
