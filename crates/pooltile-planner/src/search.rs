//! Per-axis split search and the joint fallback.
//!
//! Feasibility is the conjunction of two predicates:
//!
//! * capacity: `estimate(tile).total_bytes <= budget` and the input tile
//!   within the element cap
//! * utilization: `tile.total_tiles() >= lane_count`
//!
//! Capacity can only turn false as an inner extent grows and utilization
//! can only turn false as it grows, so along one axis the feasible inner
//! extents form a prefix `[1, e_max]` and a bisection finds `e_max` exactly.

use pooltile_common::{PoolTileError, Result, ceil_div};

use crate::capacity::CapacityModel;
use crate::footprint::{FootprintEstimate, FootprintEstimator};
use crate::shape::ShapeModel;
use crate::tile::{Axis, TileShape};

/// Largest `u` in `[lo, hi)` with `pred(u)`, given `pred(lo)` holds,
/// `pred(hi)` does not, and `pred` flips at most once.
pub fn largest_feasible(mut lo: u64, mut hi: u64, mut pred: impl FnMut(u64) -> bool) -> u64 {
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Split search over one shape and capacity model.
#[derive(Debug, Clone, Copy)]
pub struct AxisSplitSearch<'a> {
    shape: &'a ShapeModel,
    capacity: &'a CapacityModel,
    estimator: FootprintEstimator<'a>,
}

impl<'a> AxisSplitSearch<'a> {
    pub fn new(shape: &'a ShapeModel, capacity: &'a CapacityModel) -> Self {
        Self { shape, capacity, estimator: FootprintEstimator::new(shape, capacity) }
    }

    pub fn shape(&self) -> &ShapeModel {
        self.shape
    }

    pub fn estimate(&self, tile: &TileShape) -> FootprintEstimate {
        self.estimator.estimate(tile)
    }

    pub fn fits(&self, tile: &TileShape) -> bool {
        self.estimator.fits(tile)
    }

    pub fn saturates(&self, tile: &TileShape) -> bool {
        tile.total_tiles() >= self.capacity.lane_count()
    }

    pub fn feasible(&self, tile: &TileShape) -> bool {
        self.fits(tile) && self.saturates(tile)
    }

    /// Channel tiles move in whole vector registers of the data type.
    pub fn channel_granule(&self) -> u64 {
        self.capacity
            .vector_elems(self.shape.data_width())
            .min(self.shape.extent(Axis::Channel))
            .max(1)
    }

    fn granule(&self, axis: Axis) -> u64 {
        match axis {
            Axis::Channel => self.channel_granule(),
            _ => 1,
        }
    }

    /// Starting shape for searching `axis` alone: axes ahead of it in
    /// priority order are fully split, the ones after it are whole.
    pub fn cascade_base(&self, axis: Axis) -> TileShape {
        let mut tile = TileShape::unsplit(self.shape);
        for earlier in Axis::ALL.iter().take_while(|&&a| a != axis) {
            tile.split(*earlier, 1);
        }
        tile
    }

    /// Coarsest feasible split of `axis` with every other axis held as in
    /// `base`, or `None` when even the finest split of `axis` fails.
    pub fn split_axis(&self, base: &TileShape, axis: Axis) -> Option<TileShape> {
        let granule = self.granule(axis);
        let units_total = ceil_div(base.axis(axis).extent(), granule);
        let with_units = |units: u64| base.clone().with_split(axis, units.saturating_mul(granule));

        let needed = ceil_div(self.capacity.lane_count(), base.tiles_excluding(axis)).max(1);
        let initial = ceil_div(units_total, needed).max(1);
        let candidate = with_units(initial);
        if self.feasible(&candidate) {
            tracing::debug!("{axis}: even split accepted ({candidate})");
            return Some(candidate);
        }
        if initial == 1 || !self.feasible(&with_units(1)) {
            tracing::trace!("{axis}: no feasible split");
            return None;
        }

        let units = largest_feasible(1, initial, |u| self.feasible(&with_units(u)));
        let tile = with_units(units);
        tracing::debug!("{axis}: bisected to {units} x {granule} ({tile})");
        Some(tile)
    }

    /// Smallest tile the planner can ever emit: one row and column of one
    /// high slice, one channel granule wide.
    pub fn finest_tile(&self) -> TileShape {
        self.cascade_base(Axis::Channel).with_split(Axis::Channel, self.channel_granule())
    }

    /// Try each axis of `order` alone from its cascade base; first success wins.
    pub fn split_in_priority(&self, order: &[Axis]) -> Option<(Axis, TileShape)> {
        order.iter().find_map(|&axis| {
            self.split_axis(&self.cascade_base(axis), axis).map(|tile| (axis, tile))
        })
    }

    /// Multi-axis fallback.
    ///
    /// Starts from one high row with both spatial axes whole, then adds one
    /// outer tile at a time to height, and once height is down to a single
    /// row to width, while the tile is over budget or does not yet fill the
    /// lanes. When both spatial axes are at 1 and the tile is still too big
    /// the channel axis is bisected under the capacity predicate alone.
    /// Utilization is best effort here; capacity is not.
    pub fn joint_fallback(&self) -> Result<TileShape> {
        // Spatial axes start whole even for stride-aligned shapes; the
        // shrink loop below visits the stride-sized tiles on its way down.
        let mut tile = TileShape::unsplit(self.shape).with_split(Axis::High, 1);

        while !self.feasible(&tile) {
            let axis = if tile.inner(Axis::Height) > 1 {
                Axis::Height
            } else if tile.inner(Axis::Width) > 1 {
                Axis::Width
            } else {
                break;
            };
            let current = *tile.axis(axis);
            let next = (current.inner() - 1).min(ceil_div(current.extent(), current.outer() + 1));
            tile.split(axis, next);
            tracing::trace!("fallback: {axis} -> {next} ({tile})");
        }

        if self.fits(&tile) {
            return Ok(tile);
        }

        let granule = self.channel_granule();
        let finest = self.finest_tile();
        let smallest = self.estimate(&finest);
        if !self.fits(&finest) {
            let budget = self.capacity.buffer_budget_bytes();
            let cap = self.capacity.max_input_elements();
            tracing::warn!(
                "no tile fits: finest {finest} needs {} B of {budget} B, {} of {cap} input elements",
                smallest.total_bytes,
                smallest.input_elements
            );
            let reason = if smallest.total_bytes > budget {
                format!("{} tile {finest} exceeds the scratch budget", self.shape.layout())
            } else {
                format!(
                    "{} tile {finest} moves {} input elements, cap is {cap}",
                    self.shape.layout(),
                    smallest.input_elements
                )
            };
            return Err(PoolTileError::PlanningInfeasible {
                reason,
                budget_bytes: budget,
                smallest_footprint_bytes: smallest.total_bytes,
            });
        }

        let units_total = ceil_div(tile.axis(Axis::Channel).extent(), granule);
        let units = largest_feasible(1, units_total, |u| {
            self.fits(&tile.clone().with_split(Axis::Channel, u.saturating_mul(granule)))
        });
        tile.split(Axis::Channel, units.saturating_mul(granule));
        tracing::debug!("fallback: channel bisected to {units} x {granule} ({tile})");
        Ok(tile)
    }
}
