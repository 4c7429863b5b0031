//! Planner hardware configuration file format.
//!
//! Loads [`PlannerConfig`] from a TOML file (`pooltile.toml`) with
//! environment variable overrides via `POOLTILE_*` prefixed variables.
//! Defaults describe a 64-lane vector target with 240 KiB of scratch per
//! lane.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::math::align_down;

/// Hardware numbers the planner needs, as reported by the platform query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Independent execution lanes (cores).
    /// Override: `POOLTILE_LANE_COUNT`
    pub lane_count: u64,

    /// Raw scratch buffer bytes per lane.
    /// Override: `POOLTILE_SCRATCH_BYTES`
    pub scratch_bytes: u64,

    /// Housekeeping bytes reserved out of `scratch_bytes`.
    /// Override: `POOLTILE_RESERVED_BYTES`
    pub reserved_bytes: u64,

    /// Vector register width in bytes.
    /// Override: `POOLTILE_VECTOR_WIDTH_BYTES`
    pub vector_width_bytes: u64,

    /// Scratch buffer alignment granularity in bytes.
    /// Override: `POOLTILE_ALIGNMENT_BYTES`
    pub alignment_bytes: u64,

    /// Fixed per-tile helper bytes counted in every footprint.
    /// Override: `POOLTILE_TILE_OVERHEAD_BYTES`
    pub tile_overhead_bytes: u64,

    /// Largest input tile, in elements, one copy-in may move.
    /// Override: `POOLTILE_MAX_INPUT_ELEMENTS`
    pub max_input_elements: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            lane_count: 64,
            scratch_bytes: 245_760,
            reserved_bytes: 20_480,
            vector_width_bytes: 256,
            alignment_bytes: 32,
            tile_overhead_bytes: 256,
            max_input_elements: u64::from(u16::MAX),
        }
    }
}

/// Errors that can occur when loading or validating a [`PlannerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

/// Environment variables consulted by [`PlannerConfig::apply_env_overrides`].
pub const ENV_OVERRIDES: [&str; 7] = [
    "POOLTILE_LANE_COUNT",
    "POOLTILE_SCRATCH_BYTES",
    "POOLTILE_RESERVED_BYTES",
    "POOLTILE_VECTOR_WIDTH_BYTES",
    "POOLTILE_ALIGNMENT_BYTES",
    "POOLTILE_TILE_OVERHEAD_BYTES",
    "POOLTILE_MAX_INPUT_ELEMENTS",
];

impl PlannerConfig {
    /// Render the default configuration as TOML.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields, then apply environment variable overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading planner config");
        Self::from_toml(&contents)
    }

    /// Load from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: PlannerConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Scratch bytes left for tiles once the reserve is taken out, rounded
    /// down to whole alignment blocks.
    pub fn buffer_budget_bytes(&self) -> u64 {
        align_down(self.scratch_bytes.saturating_sub(self.reserved_bytes), self.alignment_bytes)
    }

    /// Check the configuration for values the planner cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::Validation("lane_count must be > 0".into()));
        }
        if self.reserved_bytes >= self.scratch_bytes {
            return Err(ConfigError::Validation(format!(
                "reserved_bytes ({}) must be < scratch_bytes ({})",
                self.reserved_bytes, self.scratch_bytes
            )));
        }
        if !self.alignment_bytes.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "alignment_bytes must be a power of two, got {}",
                self.alignment_bytes
            )));
        }
        if !self.vector_width_bytes.is_power_of_two() {
            return Err(ConfigError::Validation(format!(
                "vector_width_bytes must be a power of two, got {}",
                self.vector_width_bytes
            )));
        }
        if self.vector_width_bytes < self.alignment_bytes {
            return Err(ConfigError::Validation(format!(
                "vector_width_bytes ({}) must be >= alignment_bytes ({})",
                self.vector_width_bytes, self.alignment_bytes
            )));
        }
        if self.max_input_elements == 0 {
            return Err(ConfigError::Validation("max_input_elements must be > 0".into()));
        }
        Ok(())
    }

    /// Apply `POOLTILE_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let [lanes, scratch, reserved, vector, align, overhead, max_input] = ENV_OVERRIDES;
        override_u64(lanes, &mut self.lane_count)?;
        override_u64(scratch, &mut self.scratch_bytes)?;
        override_u64(reserved, &mut self.reserved_bytes)?;
        override_u64(vector, &mut self.vector_width_bytes)?;
        override_u64(align, &mut self.alignment_bytes)?;
        override_u64(overhead, &mut self.tile_overhead_bytes)?;
        override_u64(max_input, &mut self.max_input_elements)?;
        Ok(())
    }
}

fn override_u64(key: &str, slot: &mut u64) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(key) {
        *slot = val.trim().parse::<u64>().map_err(|e| ConfigError::EnvOverride {
            key: key.into(),
            value: val.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(key, value = *slot, "applied env override");
    }
    Ok(())
}
