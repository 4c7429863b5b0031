//! Tile-to-lane distribution.

use pooltile_common::ceil_div;
use serde::Serialize;

use crate::tile::{Axis, TileShape};

/// Number of tiles of size `inner` needed to cover `extent`.
pub fn outer_count(extent: u64, inner: u64) -> u64 {
    ceil_div(extent, inner.max(1))
}

/// Size of the last tile along an axis; equals `inner` when it divides
/// `extent` evenly.
pub fn tail_extent(extent: u64, inner: u64) -> u64 {
    let inner = inner.max(1);
    extent.saturating_sub(inner.saturating_mul(outer_count(extent, inner).saturating_sub(1)))
}

/// Inner, tail and outer count of one axis in a finished plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisSchedule {
    pub inner: u64,
    pub tail: u64,
    pub outer: u64,
}

/// Per-axis tiling plus lane assignment.
///
/// Tiles are dealt out so that every one of `min(total_tiles, lane_count)`
/// lanes gets work: the first `normal_lanes` lanes run `normal_lane_tiles`
/// tiles each and the remaining lanes run one fewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSchedule {
    axes: [AxisSchedule; 4],
    pub total_tiles: u64,
    pub used_lanes: u64,
    /// Largest per-lane tile count.
    pub normal_lane_tiles: u64,
    /// Lanes running `normal_lane_tiles`, in `[1, used_lanes]`.
    pub normal_lanes: u64,
    /// Tiles handled by the last used lane, in `[1, normal_lane_tiles]`.
    pub tail_lane_tiles: u64,
}

impl LaneSchedule {
    pub fn axis(&self, axis: Axis) -> &AxisSchedule {
        &self.axes[axis.index()]
    }
}

/// Splits a tile shape into per-lane work counts.
#[derive(Debug, Clone, Copy)]
pub struct BlockScheduler {
    lane_count: u64,
}

impl BlockScheduler {
    pub fn new(lane_count: u64) -> Self {
        Self { lane_count: lane_count.max(1) }
    }

    pub fn schedule(&self, tile: &TileShape) -> LaneSchedule {
        let axes = Axis::ALL.map(|axis| {
            let a = tile.axis(axis);
            AxisSchedule { inner: a.inner(), tail: a.tail(), outer: a.outer() }
        });
        let total_tiles = tile.total_tiles().max(1);
        let used_lanes = total_tiles.min(self.lane_count);
        let base = total_tiles / used_lanes;
        let extra = total_tiles % used_lanes;
        let (normal_lane_tiles, normal_lanes, tail_lane_tiles) =
            if extra == 0 { (base, used_lanes, base) } else { (base + 1, extra, base) };

        LaneSchedule {
            axes,
            total_tiles,
            used_lanes,
            normal_lane_tiles,
            normal_lanes,
            tail_lane_tiles,
        }
    }
}
