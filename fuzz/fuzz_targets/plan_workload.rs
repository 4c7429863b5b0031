#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pooltile_planner::{
    Axis, AxisSplitSearch, CapacityModel, Direction, FootprintEstimator, Layout, PoolMode,
    PoolTileError, PoolWorkload, ShapeModel, WindowParams, plan,
};

#[derive(Arbitrary, Debug)]
struct AxisInput {
    input: u16,
    window: u8,
    stride: u8,
    dilation: u8,
    pad: u8,
}

#[derive(Arbitrary, Debug)]
struct PlanInput {
    nhwc: bool,
    backward: bool,
    avg: Option<bool>,
    ceil_mode: bool,
    batch: u8,
    channels: u16,
    height: AxisInput,
    width: AxisInput,
    data_width: u8,
    index_width: u8,
    lanes: u8,
    budget: u32,
    overhead: u16,
    max_input_elements: u16,
}

impl AxisInput {
    // Unclamped values are passed through so the validator sees zeros and
    // oversized padding too.
    fn params(&self) -> WindowParams {
        let window = u64::from(self.window % 16);
        WindowParams::new(u64::from(self.input), window, u64::from(self.stride % 8))
            .with_dilation(u64::from(self.dilation % 4))
            .with_pad(u64::from(self.pad % 8))
    }
}

fuzz_target!(|input: PlanInput| {
    let workload = PoolWorkload {
        layout: if input.nhwc { Layout::Nhwc } else { Layout::Nchw },
        direction: if input.backward { Direction::Backward } else { Direction::Forward },
        mode: match input.avg {
            Some(count_include_pad) => PoolMode::Avg { count_include_pad },
            None => PoolMode::Max,
        },
        batch: u64::from(input.batch),
        channels: u64::from(input.channels),
        height: input.height.params(),
        width: input.width.params(),
        data_width: 1 << (input.data_width % 4),
        index_width: 1 << (input.index_width % 4),
        ceil_mode: input.ceil_mode,
    };

    let lanes = u64::from(input.lanes).max(1);
    let budget = u64::from(input.budget).max(1);
    let Ok(capacity) = CapacityModel::new(lanes, budget, 256, 32)
        .and_then(|c| c.with_max_input_elements(u64::from(input.max_input_elements)))
    else {
        return;
    };
    let capacity = capacity.with_tile_overhead(u64::from(input.overhead));

    match plan(&workload, &capacity) {
        Ok(p) => {
            let shape = ShapeModel::new(&workload).expect("planned workload must be valid");
            let estimator = FootprintEstimator::new(&shape, &capacity);
            assert!(estimator.fits(p.tile()), "plan over capacity: {p}");
            assert_eq!(p.used_lanes(), p.total_tiles().min(lanes));
            for axis in Axis::ALL {
                let extent = shape.extent(axis);
                assert_eq!(p.inner(axis) * (p.outer(axis) - 1) + p.tail(axis), extent);
            }
        }
        Err(PoolTileError::PlanningInfeasible { .. }) => {
            let shape = ShapeModel::new(&workload).expect("infeasible workload must be valid");
            let search = AxisSplitSearch::new(&shape, &capacity);
            assert!(!search.fits(&search.finest_tile()));
        }
        Err(_) => {}
    }
});
