//! Standard location of the engine config file

use std::path::PathBuf;

/// `<platform config dir>/zpd/config.yaml`, or `./zpd/config.yaml` when the
/// platform has no config directory
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zpd")
        .join("config.yaml")
}
