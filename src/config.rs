// Transport configuration (RON)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransportError};

/// Settings for the shared host-sync segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSyncConfig {
    /// Try to publish transport state for external plugins
    pub enabled: bool,
    pub segment_name: String,
    /// Directory holding the segment; defaults to the runtime directory
    pub directory: Option<PathBuf>,
    /// Subtract one buffer of latency from the published position
    pub compensate_latency: bool,
}

impl HostSyncConfig {
    /// Full path of the segment file
    pub fn segment_path(&self) -> PathBuf {
        let directory = self
            .directory
            .clone()
            .or_else(dirs::runtime_dir)
            .unwrap_or_else(std::env::temp_dir);
        directory.join(&self.segment_name)
    }
}

impl Default for HostSyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            segment_name: "song_transport_sync".to_string(),
            directory: None,
            compensate_latency: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub sample_rate: u32,
    pub frames_per_period: usize,
    /// Capacity of the transport event channel
    pub event_capacity: usize,
    pub host_sync: HostSyncConfig,
}

impl TransportConfig {
    /// Load from a RON file; absent fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text).map_err(|message| TransportError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_ron(text: &str) -> std::result::Result<Self, String> {
        ron::from_str(text).map_err(|e| e.to_string())
    }

    pub fn to_ron(&self) -> std::result::Result<String, String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| e.to_string())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frames_per_period: 512,
            event_capacity: 256,
            host_sync: HostSyncConfig::default(),
        }
    }
}
