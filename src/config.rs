//! Run configuration.
//!
//! Only `max_level` and `only_changes` shape the extracted table. The volume
//! threshold, tick size, discretization mode and data fraction are accepted
//! and carried through so callers and replay collaborators can read them, but
//! the pipeline does not consult them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// How time is discretized into bars.
///
/// Labels are assigned by the same sequential counter in both modes; the
/// mode only names the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDiscretization {
    /// Volume bars
    #[default]
    VolumeBar,
    /// One observation per book update
    Natural,
}

impl TimeDiscretization {
    /// Name used on the command line and in the output file name.
    pub fn name(&self) -> &'static str {
        match self {
            TimeDiscretization::VolumeBar => "volumebar",
            TimeDiscretization::Natural => "natural",
        }
    }
}

impl fmt::Display for TimeDiscretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TimeDiscretization {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "volumebar" => Ok(TimeDiscretization::VolumeBar),
            "natural" => Ok(TimeDiscretization::Natural),
            other => Err(FeatureError::InvalidConfig(format!(
                "unknown time discretization '{other}' (expected 'volumebar' or 'natural')"
            ))),
        }
    }
}

/// Configuration for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Raw message data, handed to the replay collaborator
    pub data_path: PathBuf,

    /// Volume threshold for a volume bar (not used by the pipeline)
    pub volume_threshold: u64,

    /// Price discretization interval (not used by the pipeline)
    pub tick_size: f64,

    /// Number of book levels per side to keep
    pub max_level: usize,

    /// Time discretization mode
    pub time_discretization: TimeDiscretization,

    /// Fraction of messages to read (not used by the pipeline)
    pub data_frac: f64,

    /// Keep a snapshot only if its top levels changed since the last kept one
    pub only_changes: bool,

    /// Directory the feature table is written to
    pub output_dir: PathBuf,

    /// Batching size requested from the snapshot stream
    pub block_size: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("../data/2505133.csv"),
            volume_threshold: 1_000_000,
            tick_size: 0.0001,
            max_level: 10,
            time_discretization: TimeDiscretization::VolumeBar,
            data_frac: 1.0,
            only_changes: false,
            output_dir: PathBuf::from("../data_cleaned"),
            block_size: 5000,
        }
    }
}

impl ExtractorConfig {
    /// Create a new config with the specified number of levels.
    pub fn new(max_level: usize) -> Self {
        Self {
            max_level,
            ..Default::default()
        }
    }

    /// Set the raw data path.
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the volume threshold.
    pub fn with_volume_threshold(mut self, threshold: u64) -> Self {
        self.volume_threshold = threshold;
        self
    }

    /// Set the tick size.
    pub fn with_tick_size(mut self, tick_size: f64) -> Self {
        self.tick_size = tick_size;
        self
    }

    /// Set the number of levels.
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Set the time discretization mode.
    pub fn with_time_discretization(mut self, mode: TimeDiscretization) -> Self {
        self.time_discretization = mode;
        self
    }

    /// Set the data fraction.
    pub fn with_data_frac(mut self, frac: f64) -> Self {
        self.data_frac = frac;
        self
    }

    /// Enable/disable deduplication of unchanged books.
    pub fn with_only_changes(mut self, only_changes: bool) -> Self {
        self.only_changes = only_changes;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the stream batching size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_level == 0 {
            return Err(FeatureError::InvalidConfig(
                "max_level must be at least 1".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(FeatureError::InvalidConfig(
                "block_size must be at least 1".to_string(),
            ));
        }
        if !self.tick_size.is_finite() || self.tick_size <= 0.0 {
            return Err(FeatureError::InvalidConfig(format!(
                "tick_size must be positive, got {}",
                self.tick_size
            )));
        }
        if !(self.data_frac > 0.0 && self.data_frac <= 1.0) {
            return Err(FeatureError::InvalidConfig(format!(
                "data_frac must be in (0, 1], got {}",
                self.data_frac
            )));
        }
        Ok(())
    }

    /// File name of the feature table for this configuration.
    pub fn output_file_name(&self) -> String {
        format!(
            "time_evolution_{}_levels_{}.csv",
            self.max_level,
            self.time_discretization.name()
        )
    }

    /// Full path of the feature table for this configuration.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(self.output_file_name())
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FeatureError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            FeatureError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Save this config as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FeatureError::generic(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, json).map_err(|e| FeatureError::persistence(path, e))
    }
}
