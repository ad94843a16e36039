// SPDX-License-Identifier: MIT OR Apache-2.0
//! Monitor settings and configuration.
//!
//! Settings live in a RON file whose path is the first command line
//! argument. Every field has a default, so a partial file (or no file at
//! all) is fine.

use patchwork_graph::{LayoutCursor, Point, Rect};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Errors loading or saving settings and session scripts
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid RON for the expected type
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: ron::error::SpannedError,
    },

    /// Serializing to RON failed
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// The file was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Newest version this build understands
        supported: u32,
    },
}

/// Read a RON file into any deserializable type
pub fn read_ron<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Where the first nodes land on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Position of the first node
    pub origin: Point,
    /// Diagonal offset between consecutive nodes
    pub step: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let cursor = LayoutCursor::default();
        Self {
            origin: cursor.next,
            step: cursor.step,
        }
    }
}

impl LayoutSettings {
    /// Cursor for a fresh graph
    pub fn cursor(&self) -> LayoutCursor {
        LayoutCursor::new(self.origin, self.step)
    }
}

/// Monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Settings format version
    pub version: u32,
    /// How often the graph drains the session queue
    pub poll_interval_ms: u64,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Session script to replay; the built-in demo when absent
    pub script: Option<PathBuf>,
    /// Node placement
    pub layout: LayoutSettings,
    /// Pad pairs to link once the script has run
    pub connect: Vec<(u32, u32)>,
    /// Rubberband rectangle applied to the final graph
    pub selection: Option<Rect>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            poll_interval_ms: 16,
            log_filter: "patchwork=debug,patchwork_graph=debug".to_string(),
            script: None,
            layout: LayoutSettings::default(),
            connect: Vec::new(),
            selection: None,
        }
    }
}

impl MonitorSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let settings: MonitorSettings = read_ron(path)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings from a file if one was given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Poll interval as a duration, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
