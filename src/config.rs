// Grid configuration loaded from YAML

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::viewport::{DEFAULT_MEASURE_EPSILON, DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT};

/// Tunables for a grid; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Initial row height in px, before any measurement
    pub row_height: f64,
    /// Extra rows rendered above and below the visible ones
    pub overscan: usize,
    /// Quiet period before typed search text is applied
    pub debounce_ms: u64,
    /// Row-height change (px) below which a new measurement is ignored
    pub measure_epsilon: f64,
    /// Fixed page size; `None` means a virtualized scrolling table
    pub page_size: Option<usize>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            debounce_ms: 250,
            measure_epsilon: DEFAULT_MEASURE_EPSILON,
            page_size: None,
        }
    }
}

impl GridConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// `<config dir>/bankgrid/config.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bankgrid").join("config.yaml"))
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml_content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: GridConfig =
            serde_yaml::from_str(&yaml_content).with_context(|| format!("Failed to parse config file {:?}", path))?;
        debug!(?path, ?config, "Loaded grid config");
        Ok(config)
    }

    /// Load an explicit path (which must exist), else the default path if present, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                info!(?path, "Using grid config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}
