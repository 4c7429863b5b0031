//! Strategy selection.
//!
//! A [`PlanSelector`] owns an ordered list of [`TilingStrategy`] values and
//! runs them in sequence: strategies that do not apply to the shape are
//! skipped, the first one that yields a tile wins, and a strategy error
//! ends the run. There is no retry and no global registry; callers that
//! want a different order construct their own list.

use pooltile_common::{PoolTileError, Result};

use crate::capacity::CapacityModel;
use crate::plan::{PlanKind, TilingPlan};
use crate::schedule::BlockScheduler;
use crate::search::AxisSplitSearch;
use crate::shape::{Layout, ShapeModel};
use crate::tile::{Axis, TileShape};

/// One named way of decomposing a workload into tiles.
pub trait TilingStrategy: Send + Sync {
    fn kind(&self) -> PlanKind;

    /// Cheap gate on the shape flags; no footprint is evaluated.
    fn is_applicable(&self, shape: &ShapeModel) -> bool;

    /// `Ok(None)` means "not feasible, try the next strategy".
    fn search(&self, search: &AxisSplitSearch<'_>) -> Result<Option<TileShape>>;
}

/// Split the high axis alone, everything else whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighAxisSplit;

impl TilingStrategy for HighAxisSplit {
    fn kind(&self) -> PlanKind {
        PlanKind::HighAxisSplit
    }

    fn is_applicable(&self, _shape: &ShapeModel) -> bool {
        true
    }

    fn search(&self, search: &AxisSplitSearch<'_>) -> Result<Option<TileShape>> {
        Ok(search.split_axis(&search.cascade_base(Axis::High), Axis::High))
    }
}

/// Stride-aligned split of one spatial or channel axis, with the axes
/// ahead of it in priority order fully split.
#[derive(Debug, Clone, Copy)]
pub struct AlignedSplit {
    axis: Axis,
}

impl AlignedSplit {
    pub const fn height() -> Self {
        Self { axis: Axis::Height }
    }

    pub const fn width() -> Self {
        Self { axis: Axis::Width }
    }

    pub const fn channel() -> Self {
        Self { axis: Axis::Channel }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }
}

impl TilingStrategy for AlignedSplit {
    fn kind(&self) -> PlanKind {
        match self.axis {
            Axis::Height => PlanKind::AlignedHeightSplit,
            Axis::Width => PlanKind::AlignedWidthSplit,
            Axis::Channel | Axis::High => PlanKind::AlignedChannelSplit,
        }
    }

    fn is_applicable(&self, shape: &ShapeModel) -> bool {
        if !shape.is_stride_aligned() {
            return false;
        }
        match self.axis {
            Axis::Channel => shape.layout() == Layout::Nhwc && shape.extent(Axis::Channel) > 1,
            _ => true,
        }
    }

    fn search(&self, search: &AxisSplitSearch<'_>) -> Result<Option<TileShape>> {
        Ok(search.split_axis(&search.cascade_base(self.axis), self.axis))
    }
}

/// Joint multi-axis fallback; the only strategy that reports failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FineGrainedFallback;

impl TilingStrategy for FineGrainedFallback {
    fn kind(&self) -> PlanKind {
        PlanKind::FineGrainedFallback
    }

    fn is_applicable(&self, _shape: &ShapeModel) -> bool {
        true
    }

    fn search(&self, search: &AxisSplitSearch<'_>) -> Result<Option<TileShape>> {
        search.joint_fallback().map(Some)
    }
}

/// Ordered strategy list; the first feasible strategy wins.
pub struct PlanSelector {
    strategies: Vec<Box<dyn TilingStrategy>>,
}

impl PlanSelector {
    /// Selector with the standard order: high axis, aligned height, width
    /// and channel, then the fine-grained fallback.
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(HighAxisSplit),
            Box::new(AlignedSplit::height()),
            Box::new(AlignedSplit::width()),
            Box::new(AlignedSplit::channel()),
            Box::new(FineGrainedFallback),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn TilingStrategy>>) -> Self {
        Self { strategies }
    }

    /// Plan kinds in probe order.
    pub fn kinds(&self) -> Vec<PlanKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run the strategies against one shape.
    pub fn select(&self, shape: &ShapeModel, capacity: &CapacityModel) -> Result<TilingPlan> {
        let search = AxisSplitSearch::new(shape, capacity);
        let scheduler = BlockScheduler::new(capacity.lane_count());

        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !strategy.is_applicable(shape) {
                tracing::trace!("skipping {kind}: not applicable");
                continue;
            }
            match strategy.search(&search)? {
                Some(tile) => {
                    let plan = TilingPlan::new(kind, tile, &search, &scheduler);
                    tracing::info!("selected {plan}");
                    return Ok(plan);
                }
                None => tracing::debug!("{kind} infeasible"),
            }
        }

        let finest = search.finest_tile();
        Err(PoolTileError::PlanningInfeasible {
            reason: "no tiling strategy produced a feasible tile".into(),
            budget_bytes: capacity.buffer_budget_bytes(),
            smallest_footprint_bytes: search.estimate(&finest).total_bytes,
        })
    }
}

impl Default for PlanSelector {
    fn default() -> Self {
        Self::new()
    }
}
