//! Engine configuration
//!
//! Hosts that want a file-backed setup describe search paths, the default
//! audio format and patches to open at startup in one YAML file:
//!
//! ```yaml
//! search_paths:
//!   - /usr/share/zpd/abstractions
//! dsp:
//!   inputs: 2
//!   outputs: 2
//!   sample_rate: 48000
//!   block_size: 64
//! patches:
//!   - main.pd
//! ```
//!
//! Everything is optional; missing fields fall back to defaults.

mod io;
mod paths;

pub use io::{load_config, read_config, save_config};
pub use paths::default_config_path;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::environment;
use crate::error::{ZpdError, ZpdResult};
use crate::types::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE, MAX_CHANNELS};

/// Audio format an instance is prepared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DspConfig {
    pub inputs: usize,
    pub outputs: usize,
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            inputs: 2,
            outputs: 2,
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl DspConfig {
    pub fn new(inputs: usize, outputs: usize, sample_rate: u32, block_size: usize) -> Self {
        Self {
            inputs,
            outputs,
            sample_rate,
            block_size,
        }
    }

    /// Reject formats the engine cannot run
    pub fn validate(&self) -> ZpdResult<()> {
        if self.sample_rate == 0 {
            return Err(ZpdError::InvalidDspConfig(
                "sample rate must be positive".into(),
            ));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ZpdError::InvalidDspConfig(format!(
                "block size {} outside 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.inputs > MAX_CHANNELS || self.outputs > MAX_CHANNELS {
            return Err(ZpdError::InvalidDspConfig(format!(
                "{} inputs / {} outputs exceeds the {} channel limit",
                self.inputs, self.outputs, MAX_CHANNELS
            )));
        }
        Ok(())
    }
}

/// File-level configuration for a host embedding the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directories appended to the global search path, in order
    pub search_paths: Vec<PathBuf>,
    pub dsp: DspConfig,
    /// Patches the host opens after startup
    pub patches: Vec<PathBuf>,
}

impl EngineConfig {
    /// Replace the process-wide search path with `search_paths`
    pub fn apply_search_paths(&self) {
        environment::searchpath_clear();
        for dir in &self.search_paths {
            environment::searchpath_add(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsp_defaults() {
        let config = DspConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dsp_validate_rejects_bad_formats() {
        assert!(DspConfig::new(2, 2, 0, 64).validate().is_err());
        assert!(DspConfig::new(2, 2, 44100, 0).validate().is_err());
        assert!(DspConfig::new(2, 2, 44100, MAX_BLOCK_SIZE + 1).validate().is_err());
        assert!(DspConfig::new(MAX_CHANNELS + 1, 2, 44100, 64).validate().is_err());
        assert!(DspConfig::new(0, 0, 96000, 128).validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EngineConfig = serde_yaml::from_str("dsp:\n  sample_rate: 48000\n").unwrap();
        assert_eq!(config.dsp.sample_rate, 48000);
        assert_eq!(config.dsp.block_size, DEFAULT_BLOCK_SIZE);
        assert!(config.search_paths.is_empty());
    }
}
