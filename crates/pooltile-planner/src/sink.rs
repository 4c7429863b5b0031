//! Hand-off of a finished plan to the serialization collaborator.

use pooltile_common::Result;
use serde::Serialize;

use crate::plan::TilingPlan;
use crate::schedule::AxisSchedule;
use crate::tile::Axis;

/// Flat record of one plan, in the field order the kernel reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TilingRecord {
    pub plan_kind: u64,
    pub variant_selector: u64,
    pub high: AxisSchedule,
    pub height: AxisSchedule,
    pub width: AxisSchedule,
    /// Always `{1, 1, 1}` for NCHW.
    pub channel: AxisSchedule,
    pub total_tiles: u64,
    pub used_lanes: u64,
    pub normal_lane_tiles: u64,
    pub normal_lanes: u64,
    pub tail_lane_tiles: u64,
    pub input_buffer_bytes: u64,
    pub staging_buffer_bytes: u64,
    pub output_buffer_bytes: u64,
    pub index_buffer_bytes: u64,
    pub divisor_buffer_bytes: u64,
}

impl From<&TilingPlan> for TilingRecord {
    fn from(plan: &TilingPlan) -> Self {
        let schedule = plan.schedule();
        let footprint = plan.footprint();
        Self {
            plan_kind: plan.kind().code(),
            variant_selector: plan.variant_selector(),
            high: *schedule.axis(Axis::High),
            height: *schedule.axis(Axis::Height),
            width: *schedule.axis(Axis::Width),
            channel: *schedule.axis(Axis::Channel),
            total_tiles: schedule.total_tiles,
            used_lanes: schedule.used_lanes,
            normal_lane_tiles: schedule.normal_lane_tiles,
            normal_lanes: schedule.normal_lanes,
            tail_lane_tiles: schedule.tail_lane_tiles,
            input_buffer_bytes: footprint.input_bytes,
            staging_buffer_bytes: footprint.staging_bytes,
            output_buffer_bytes: footprint.output_bytes,
            index_buffer_bytes: footprint.index_bytes,
            divisor_buffer_bytes: footprint.divisor_bytes,
        }
    }
}

/// Consumer of finished plans.
pub trait PlanSink {
    /// Store the flattened plan.
    fn write_record(&mut self, record: TilingRecord) -> Result<()>;

    /// Size the parallel dispatch.
    fn set_launch_blocks(&mut self, blocks: u64) -> Result<()>;
}

/// In-memory sink; keeps every record it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    records: Vec<TilingRecord>,
    launch_blocks: Option<u64>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TilingRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TilingRecord> {
        self.records.last()
    }

    pub fn launch_blocks(&self) -> Option<u64> {
        self.launch_blocks
    }
}

impl PlanSink for RecordingSink {
    fn write_record(&mut self, record: TilingRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn set_launch_blocks(&mut self, blocks: u64) -> Result<()> {
        self.launch_blocks = Some(blocks);
        Ok(())
    }
}
