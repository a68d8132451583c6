//! Configuration for linkview-core
//!
//! Interaction policy, axis precision and the defaults of the individual
//! aggregators. Every section has sensible defaults, so an empty TOML or JSON
//! document is a valid configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-wide configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkviewConfig {
    /// Host interaction policy
    pub interaction: InteractionConfig,
    /// Axis arithmetic
    pub axis: AxisConfig,
    /// Histogram defaults
    pub histogram: HistogramConfig,
    /// Survival curve settings
    pub survival: SurvivalConfig,
    /// Scatterplot settings
    pub scatter: ScatterConfig,
    /// Ranking settings
    pub ranking: RankingConfig,
}

/// Host interaction policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Never ask the host; length mismatches always create a new dataset
    pub no_interaction: bool,
}

/// Axis arithmetic configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Changes smaller than this are ignored
    pub precision: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self { precision: 1e-4 }
    }
}

/// Histogram defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Number of bars the default bin width aims for
    pub default_bars: u32,
    /// Factor applied by one step of bin width scaling
    pub bin_width_factor: f64,
    /// Anchor nudge as a fraction of the bin width
    pub anchor_step: f64,
    /// Largest number of bins a width change may produce
    pub max_bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            default_bars: 22,
            bin_width_factor: 1.1,
            anchor_step: 0.1,
            max_bins: linkview_stats::DEFAULT_MAX_BINS,
        }
    }
}

/// Survival curve settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Text value of the event variable that denotes an event
    pub event_label: String,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            event_label: "dead".to_string(),
        }
    }
}

/// Scatterplot settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Glyph diameter in screen units, used for point hit tests
    pub point_diameter: u32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self { point_diameter: 3 }
    }
}

/// Ranking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Keep the full ranking of a variable until it is mutated
    pub cache_ranks: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { cache_ranks: true }
    }
}

impl LinkviewConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.axis.precision.is_finite() && self.axis.precision > 0.0) {
            return Err(ConfigError::OutOfRange(
                "axis.precision must be positive".to_string(),
            ));
        }

        if self.histogram.default_bars == 0 {
            return Err(ConfigError::OutOfRange(
                "histogram.default_bars must be positive".to_string(),
            ));
        }

        // Scaling by 1.0 would never change the width
        if !(self.histogram.bin_width_factor.is_finite() && self.histogram.bin_width_factor > 1.0)
        {
            return Err(ConfigError::OutOfRange(
                "histogram.bin_width_factor must be greater than 1.0".to_string(),
            ));
        }

        if !(self.histogram.anchor_step > 0.0 && self.histogram.anchor_step <= 1.0) {
            return Err(ConfigError::OutOfRange(
                "histogram.anchor_step must be in (0.0, 1.0]".to_string(),
            ));
        }

        // the default width needs up to default_bars + 2 bins
        if self.histogram.max_bins < self.histogram.default_bars as usize + 2 {
            return Err(ConfigError::OutOfRange(
                "histogram.max_bins must be at least default_bars + 2".to_string(),
            ));
        }

        if self.survival.event_label.is_empty() {
            return Err(ConfigError::MissingField(
                "survival.event_label".to_string(),
            ));
        }

        if self.scatter.point_diameter == 0 {
            return Err(ConfigError::OutOfRange(
                "scatter.point_diameter must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
    /// Required field is missing
    #[error("Missing field: {0}")]
    MissingField(String),
}
