//! Application configuration types

mod loader;

pub use loader::load_config;

use canvasdive_canvas::MAX_TRACKS;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Clamp values into their supported ranges
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.layout.max_tracks = self.layout.max_tracks.clamp(1, MAX_TRACKS);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://canvasdive.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub max_tracks: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_tracks: MAX_TRACKS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub page_width_px: u32,
    pub page_height_px: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_width_px: 1123,
            page_height_px: 794,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
        }
    }
}

impl LogConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}
