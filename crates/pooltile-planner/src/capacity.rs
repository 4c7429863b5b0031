//! Hardware capacity model.
//!
//! A [`CapacityModel`] carries the numbers the platform query reports for a
//! target: how many lanes there are and how much scratch each lane may use
//! for one tile. It is read-only and can be shared between planning calls.

use pooltile_common::{ConfigurationError, PlannerConfig, Result};

/// Read-only hardware constants for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityModel {
    lane_count: u64,
    buffer_budget_bytes: u64,
    vector_width_bytes: u64,
    alignment_bytes: u64,
    tile_overhead_bytes: u64,
    max_input_elements: u64,
}

impl CapacityModel {
    /// Build a model from raw numbers; `buffer_budget_bytes` is already net
    /// of any housekeeping reserve. The input element cap starts at the
    /// configured default.
    pub fn new(
        lane_count: u64,
        buffer_budget_bytes: u64,
        vector_width_bytes: u64,
        alignment_bytes: u64,
    ) -> Result<Self> {
        if lane_count == 0 {
            return Err(ConfigurationError::Capacity("lane_count must be > 0".into()).into());
        }
        if buffer_budget_bytes == 0 {
            return Err(
                ConfigurationError::Capacity("buffer budget must be > 0 bytes".into()).into()
            );
        }
        if !alignment_bytes.is_power_of_two() || !vector_width_bytes.is_power_of_two() {
            return Err(ConfigurationError::Capacity(format!(
                "alignment ({alignment_bytes}) and vector width ({vector_width_bytes}) must be powers of two"
            ))
            .into());
        }
        if vector_width_bytes < alignment_bytes {
            return Err(ConfigurationError::Capacity(format!(
                "vector width ({vector_width_bytes}) must be >= alignment ({alignment_bytes})"
            ))
            .into());
        }
        Ok(Self {
            lane_count,
            buffer_budget_bytes,
            vector_width_bytes,
            alignment_bytes,
            tile_overhead_bytes: 0,
            max_input_elements: PlannerConfig::default().max_input_elements,
        })
    }

    /// Fixed helper bytes added to every tile footprint.
    #[must_use]
    pub fn with_tile_overhead(mut self, bytes: u64) -> Self {
        self.tile_overhead_bytes = bytes;
        self
    }

    /// Largest input tile, in elements, a single copy-in may move.
    pub fn with_max_input_elements(mut self, elements: u64) -> Result<Self> {
        if elements == 0 {
            return Err(
                ConfigurationError::Capacity("max_input_elements must be > 0".into()).into()
            );
        }
        self.max_input_elements = elements;
        Ok(self)
    }

    /// Build from a validated [`PlannerConfig`].
    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.lane_count,
            config.buffer_budget_bytes(),
            config.vector_width_bytes,
            config.alignment_bytes,
        )?
        .with_tile_overhead(config.tile_overhead_bytes)
        .with_max_input_elements(config.max_input_elements)?)
    }

    pub fn lane_count(&self) -> u64 {
        self.lane_count
    }

    pub fn buffer_budget_bytes(&self) -> u64 {
        self.buffer_budget_bytes
    }

    pub fn vector_width_bytes(&self) -> u64 {
        self.vector_width_bytes
    }

    pub fn alignment_bytes(&self) -> u64 {
        self.alignment_bytes
    }

    pub fn tile_overhead_bytes(&self) -> u64 {
        self.tile_overhead_bytes
    }

    pub fn max_input_elements(&self) -> u64 {
        self.max_input_elements
    }

    /// Elements of `element_width` bytes per alignment block (at least 1).
    pub fn granule(&self, element_width: u64) -> u64 {
        (self.alignment_bytes / element_width.max(1)).max(1)
    }

    /// Elements of `element_width` bytes per vector register (at least 1).
    pub fn vector_elems(&self, element_width: u64) -> u64 {
        (self.vector_width_bytes / element_width.max(1)).max(1)
    }
}

impl Default for CapacityModel {
    fn default() -> Self {
        let cfg = PlannerConfig::default();
        Self {
            lane_count: cfg.lane_count,
            buffer_budget_bytes: cfg.buffer_budget_bytes(),
            vector_width_bytes: cfg.vector_width_bytes,
            alignment_bytes: cfg.alignment_bytes,
            tile_overhead_bytes: cfg.tile_overhead_bytes,
            max_input_elements: cfg.max_input_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_default_config() {
        let cap = CapacityModel::default();
        let from_cfg = CapacityModel::from_config(&PlannerConfig::default()).unwrap();
        assert_eq!(cap, from_cfg);
        assert_eq!(cap.lane_count(), 64);
        assert_eq!(cap.buffer_budget_bytes(), 225_280);
        assert_eq!(cap.tile_overhead_bytes(), 256);
        assert_eq!(cap.max_input_elements(), 65_535);
    }

    #[test]
    fn granule_per_element_width() {
        let cap = CapacityModel::new(8, 4096, 256, 32).unwrap();
        assert_eq!(cap.granule(1), 32);
        assert_eq!(cap.granule(2), 16);
        assert_eq!(cap.granule(4), 8);
        assert_eq!(cap.granule(8), 4);
        assert_eq!(cap.vector_elems(4), 64);
    }

    #[test]
    fn granule_never_zero() {
        let cap = CapacityModel::new(8, 4096, 4, 4).unwrap();
        assert_eq!(cap.granule(8), 1);
        assert_eq!(cap.vector_elems(8), 1);
    }

    #[test]
    fn zero_lanes_rejected() {
        let err = CapacityModel::new(0, 4096, 256, 32).unwrap_err();
        assert!(err.to_string().contains("lane_count must be > 0"));
    }

    #[test]
    fn zero_budget_rejected() {
        assert!(CapacityModel::new(4, 0, 256, 32).is_err());
    }

    #[test]
    fn vector_narrower_than_alignment_rejected() {
        let err = CapacityModel::new(8, 4096, 16, 32).unwrap_err();
        assert!(err.to_string().contains("vector width (16) must be >= alignment (32)"));
        assert!(CapacityModel::new(8, 4096, 32, 32).is_ok());
    }

    #[test]
    fn input_element_cap() {
        let cap = CapacityModel::new(8, 4096, 256, 32).unwrap();
        assert_eq!(cap.max_input_elements(), 65_535);
        let cap = cap.with_max_input_elements(1024).unwrap();
        assert_eq!(cap.max_input_elements(), 1024);
        assert!(cap.with_max_input_elements(0).is_err());

        let cfg = PlannerConfig { max_input_elements: 4096, ..PlannerConfig::default() };
        assert_eq!(CapacityModel::from_config(&cfg).unwrap().max_input_elements(), 4096);
    }

    #[test]
    fn invalid_config_surfaces_config_error() {
        let cfg = PlannerConfig { alignment_bytes: 48, ..PlannerConfig::default() };
        let err = CapacityModel::from_config(&cfg).unwrap_err();
        assert!(matches!(err, pooltile_common::PoolTileError::Config(_)));
    }
}
