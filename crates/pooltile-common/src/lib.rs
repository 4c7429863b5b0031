//! Common types and utilities for the pooltile planner
//!
//! This crate holds the pieces every planning component depends on: the
//! error taxonomy, ceiling/alignment arithmetic, and the hardware
//! configuration file format.

pub mod config;
pub mod error;
pub mod math;

pub use config::{ConfigError, ENV_OVERRIDES, PlannerConfig};
pub use error::*;
pub use math::{align_down, align_up, ceil_div};
