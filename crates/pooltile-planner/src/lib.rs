//! Tile planning for windowed-reduction (pooling) kernels.
//!
//! Given a [`PoolWorkload`] and a [`CapacityModel`], the planner decides how
//! to cut the output tensor into rectangular tiles so that every tile fits
//! one lane's scratch buffer and there are enough tiles to keep every lane
//! busy. Planning is pure and synchronous: no state is shared between
//! calls and a [`CapacityModel`] may be reused across threads.
//!
//! ```no_run
//! use pooltile_planner::{CapacityModel, Layout, PoolWorkload, WindowParams, plan};
//!
//! let workload = PoolWorkload {
//!     layout: Layout::Nchw,
//!     direction: Default::default(),
//!     mode: Default::default(),
//!     batch: 2,
//!     channels: 16,
//!     height: WindowParams::new(32, 3, 1),
//!     width: WindowParams::new(16, 3, 2),
//!     data_width: 2,
//!     index_width: 4,
//!     ceil_mode: false,
//! };
//! let plan = plan(&workload, &CapacityModel::default())?;
//! println!("{plan}");
//! # Ok::<(), pooltile_planner::PoolTileError>(())
//! ```

pub mod capacity;
pub mod footprint;
pub mod plan;
pub mod schedule;
pub mod search;
pub mod selector;
pub mod shape;
pub mod sink;
pub mod tile;

pub use capacity::CapacityModel;
pub use footprint::{FootprintEstimate, FootprintEstimator};
pub use plan::{PlanKind, TilingPlan};
pub use pooltile_common::{PoolTileError, Result};
pub use schedule::{AxisSchedule, BlockScheduler, LaneSchedule};
pub use search::AxisSplitSearch;
pub use selector::{AlignedSplit, FineGrainedFallback, HighAxisSplit, PlanSelector, TilingStrategy};
pub use shape::{Direction, Layout, PoolMode, PoolWorkload, ShapeModel, WindowParams};
pub use sink::{PlanSink, RecordingSink, TilingRecord};
pub use tile::{Axis, AxisTile, TileShape};

/// Plan one workload with the standard strategy order.
pub fn plan(workload: &PoolWorkload, capacity: &CapacityModel) -> Result<TilingPlan> {
    let shape = ShapeModel::new(workload)?;
    PlanSelector::default().select(&shape, capacity)
}

/// Plan one workload and hand the result to `sink`; returns the launch
/// block count.
pub fn plan_into(
    workload: &PoolWorkload,
    capacity: &CapacityModel,
    sink: &mut dyn PlanSink,
) -> Result<u64> {
    let plan = plan(workload, capacity)?;
    let blocks = plan.launch_blocks();
    sink.write_record(TilingRecord::from(&plan))?;
    sink.set_launch_blocks(blocks)?;
    Ok(blocks)
}
