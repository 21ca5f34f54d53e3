// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Control band configuration
//!
//! Loaded with priority: file > env > defaults.
//!
//! ```toml
//! group_by = "sensor.id"
//! value_field = "reading"
//! state_path = "/var/lib/controlbands/state.bin"
//!
//! [band_interval]
//! days = 2
//! seconds = 300
//! ```

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_BAND_INTERVAL_SECS: &str = "CONTROLBANDS_BAND_INTERVAL_SECS";
const ENV_GROUP_BY: &str = "CONTROLBANDS_GROUP_BY";
const ENV_VALUE_FIELD: &str = "CONTROLBANDS_VALUE_FIELD";
const ENV_STATE_PATH: &str = "CONTROLBANDS_STATE_PATH";

/// Length of the trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandInterval {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: f64,
}

impl BandInterval {
    pub fn from_secs(seconds: f64) -> Self {
        Self {
            days: 0,
            hours: 0,
            minutes: 0,
            seconds,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        // Float math: day counts from TOML may exceed u64 seconds
        self.days as f64 * 86_400.0
            + self.hours as f64 * 3_600.0
            + self.minutes as f64 * 60.0
            + self.seconds
    }
}

impl Default for BandInterval {
    fn default() -> Self {
        Self {
            days: 1,
            hours: 0,
            minutes: 0,
            seconds: 0.0,
        }
    }
}

/// Settings for a band pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Trailing window; older batches stop contributing
    #[serde(default)]
    pub band_interval: BandInterval,

    /// Dotted field path resolving a record's group (None = single group)
    #[serde(default)]
    pub group_by: Option<String>,

    /// Dotted field path holding the observed value
    #[serde(default = "default_value_field")]
    pub value_field: String,

    /// Snapshot file for the windowed state
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

fn default_value_field() -> String {
    "value".to_string()
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            band_interval: BandInterval::default(),
            group_by: None,
            value_field: default_value_field(),
            state_path: None,
        }
    }
}

impl BandConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - CONTROLBANDS_BAND_INTERVAL_SECS: window length in seconds (default: one day)
    /// - CONTROLBANDS_GROUP_BY: group key field path
    /// - CONTROLBANDS_VALUE_FIELD: value field path (default: value)
    /// - CONTROLBANDS_STATE_PATH: snapshot file
    pub fn from_env() -> Self {
        Self::default().merge_with_env()
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<&Path>) -> CoreResult<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::default().merge_with_env().overlay_file(path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::from_env()
            }
            None => Self::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    fn overlay_file(self, path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;
        let from_file: Self = toml::from_str(&content)?;

        // Only fields present in the file win over the environment
        let mut config = self;
        if table.contains_key("band_interval") {
            config.band_interval = from_file.band_interval;
        }
        if table.contains_key("group_by") {
            config.group_by = from_file.group_by;
        }
        if table.contains_key("value_field") {
            config.value_field = from_file.value_field;
        }
        if table.contains_key("state_path") {
            config.state_path = from_file.state_path;
        }
        Ok(config)
    }

    fn merge_with_env(mut self) -> Self {
        if let Ok(secs) = std::env::var(ENV_BAND_INTERVAL_SECS) {
            match secs.parse::<f64>() {
                Ok(val) => self.band_interval = BandInterval::from_secs(val),
                Err(_) => tracing::warn!(
                    "Ignoring {}={:?}: not a number of seconds",
                    ENV_BAND_INTERVAL_SECS,
                    secs
                ),
            }
        }

        if let Ok(group_by) = std::env::var(ENV_GROUP_BY) {
            self.group_by = Some(group_by).filter(|g| !g.is_empty());
        }

        if let Ok(field) = std::env::var(ENV_VALUE_FIELD) {
            self.value_field = field;
        }

        if let Ok(path) = std::env::var(ENV_STATE_PATH) {
            self.state_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> CoreResult<()> {
        let secs = self.band_interval.total_seconds();
        if !secs.is_finite() || secs <= 0.0 {
            return Err(CoreError::InvalidConfig(format!(
                "band interval must be a positive number of seconds, got {}",
                secs
            )));
        }
        if self.value_field.is_empty() {
            return Err(CoreError::InvalidConfig(
                "value_field must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
