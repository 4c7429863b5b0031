//! Error taxonomy for tile planning.
//!
//! Only two kinds of failure cross the planner boundary: the workload or
//! hardware description is inconsistent ([`ConfigurationError`]), or no
//! tile shape fits the scratch budget ([`PoolTileError::PlanningInfeasible`]).
//! Loading a [`crate::PlannerConfig`] adds its own [`crate::ConfigError`].

use thiserror::Error;

use crate::config::ConfigError;

/// Result alias used across the pooltile crates.
pub type Result<T, E = PoolTileError> = std::result::Result<T, E>;

/// Top-level error returned by the planner.
#[derive(Debug, Error)]
pub enum PoolTileError {
    /// The workload or capacity description violates an axis invariant.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// No plan kind produced a tile that fits the scratch budget.
    #[error(
        "planning infeasible: {reason} (budget {budget_bytes} B, finest tile needs {smallest_footprint_bytes} B)"
    )]
    PlanningInfeasible { reason: String, budget_bytes: u64, smallest_footprint_bytes: u64 },

    /// The planner configuration could not be loaded or validated.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl PoolTileError {
    /// Planning failures are a hard stop for the operator invocation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PoolTileError::PlanningInfeasible { .. })
    }
}

/// Workload or hardware parameters that break an axis invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{axis}: {field} must be > 0")]
    ZeroValue { axis: &'static str, field: &'static str },

    #[error("{axis}: padding {pad} exceeds half of the window {window}")]
    PaddingTooLarge { axis: &'static str, pad: u64, window: u64 },

    #[error("{axis}: effective window {window} exceeds padded input {padded_input}")]
    WindowExceedsInput { axis: &'static str, window: u64, padded_input: u64 },

    #[error("{axis}: output extent is empty")]
    EmptyOutput { axis: &'static str },

    #[error("unsupported element width: {0} bytes")]
    UnsupportedElementWidth(u64),

    #[error("index element width {index} B is narrower than data element width {data} B")]
    IndexNarrowerThanData { index: u64, data: u64 },

    #[error("capacity: {0}")]
    Capacity(String),
}
