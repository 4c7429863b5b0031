//! The immutable result of one planning call.

use std::fmt;

use serde::Serialize;

use crate::footprint::FootprintEstimate;
use crate::schedule::{BlockScheduler, LaneSchedule};
use crate::search::AxisSplitSearch;
use crate::shape::{Direction, Layout, PoolMode};
use crate::tile::{Axis, TileShape};

/// Which strategy produced a plan; selects the matching execution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlanKind {
    HighAxisSplit,
    AlignedHeightSplit,
    AlignedWidthSplit,
    AlignedChannelSplit,
    FineGrainedFallback,
}

impl PlanKind {
    /// Stable discriminant written into the tiling record.
    pub fn code(self) -> u64 {
        match self {
            PlanKind::HighAxisSplit => 1,
            PlanKind::AlignedHeightSplit => 2,
            PlanKind::AlignedWidthSplit => 3,
            PlanKind::AlignedChannelSplit => 4,
            PlanKind::FineGrainedFallback => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlanKind::HighAxisSplit => "high-axis-split",
            PlanKind::AlignedHeightSplit => "aligned-height-split",
            PlanKind::AlignedWidthSplit => "aligned-width-split",
            PlanKind::AlignedChannelSplit => "aligned-channel-split",
            PlanKind::FineGrainedFallback => "fine-grained-fallback",
        }
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Winning tile shape together with its lane schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingPlan {
    kind: PlanKind,
    layout: Layout,
    direction: Direction,
    mode: PoolMode,
    has_padding: bool,
    wide_index: bool,
    tile: TileShape,
    schedule: LaneSchedule,
    footprint: FootprintEstimate,
}

impl TilingPlan {
    pub(crate) fn new(
        kind: PlanKind,
        tile: TileShape,
        search: &AxisSplitSearch<'_>,
        scheduler: &BlockScheduler,
    ) -> Self {
        let shape = search.shape();
        Self {
            kind,
            layout: shape.layout(),
            direction: shape.direction(),
            mode: shape.mode(),
            has_padding: shape.has_padding(),
            wide_index: shape.index_width() == 8,
            schedule: scheduler.schedule(&tile),
            footprint: search.estimate(&tile),
            tile,
        }
    }

    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    pub fn tile(&self) -> &TileShape {
        &self.tile
    }

    pub fn schedule(&self) -> &LaneSchedule {
        &self.schedule
    }

    pub fn footprint(&self) -> &FootprintEstimate {
        &self.footprint
    }

    pub fn inner(&self, axis: Axis) -> u64 {
        self.schedule.axis(axis).inner
    }

    pub fn tail(&self, axis: Axis) -> u64 {
        self.schedule.axis(axis).tail
    }

    pub fn outer(&self, axis: Axis) -> u64 {
        self.schedule.axis(axis).outer
    }

    pub fn total_tiles(&self) -> u64 {
        self.schedule.total_tiles
    }

    pub fn used_lanes(&self) -> u64 {
        self.schedule.used_lanes
    }

    pub fn normal_lane_tiles(&self) -> u64 {
        self.schedule.normal_lane_tiles
    }

    pub fn normal_lanes(&self) -> u64 {
        self.schedule.normal_lanes
    }

    pub fn tail_lane_tiles(&self) -> u64 {
        self.schedule.tail_lane_tiles
    }

    /// Block count for the launch collaborator.
    pub fn launch_blocks(&self) -> u64 {
        self.schedule.used_lanes
    }

    /// Decimal-packed key of the execution variant:
    /// `mode | direction | kind | layout | wide index | padding`.
    pub fn variant_selector(&self) -> u64 {
        self.mode.code() * 100_000
            + self.direction.code() * 10_000
            + self.kind.code() * 1_000
            + self.layout.code() * 100
            + u64::from(self.wide_index) * 10
            + u64::from(self.has_padding)
    }
}

impl fmt::Display for TilingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] tiles={} lanes={} ({}x{}, rest {}) bytes={}",
            self.kind,
            self.tile,
            self.schedule.total_tiles,
            self.schedule.used_lanes,
            self.schedule.normal_lanes,
            self.schedule.normal_lane_tiles,
            self.schedule.tail_lane_tiles,
            self.footprint.total_bytes
        )
    }
}
