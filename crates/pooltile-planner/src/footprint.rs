//! Scratch footprint of a candidate tile.
//!
//! [`FootprintEstimator::estimate`] is the only feasibility oracle the
//! search uses. The total is
//!
//! ```text
//! (input [+ input again when padded] + output + index | divisor + overhead) * 2
//! ```
//!
//! where the padded copy is the unaligned working buffer for the padded
//! input and the factor of two models double buffering of compute and
//! data movement. Max pooling carries the argmax index buffer; average
//! pooling carries an fp32 divisor per output element instead, and only
//! when padding makes the divisor vary. Every term is monotone in every
//! inner extent.
//!
//! A tile fits when the total is within the byte budget and the aligned
//! input tile stays within the capacity model's element cap.

use std::fmt;

use pooltile_common::align_up;

use crate::capacity::CapacityModel;
use crate::shape::{Layout, ShapeModel};
use crate::tile::{Axis, TileShape};

const DOUBLE_BUFFER: u64 = 2;
const DIVISOR_WIDTH: u64 = 4;

/// Scratch bytes required by one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FootprintEstimate {
    /// Aligned input elements moved per copy-in.
    pub input_elements: u64,
    pub input_bytes: u64,
    /// Unaligned working copy of the input; zero without padding.
    pub staging_bytes: u64,
    pub output_bytes: u64,
    /// Argmax indices; zero for average pooling.
    pub index_bytes: u64,
    /// fp32 average divisors; zero unless the divisor varies per output.
    pub divisor_bytes: u64,
    /// Total after the double-buffering multiplier.
    pub total_bytes: u64,
}

impl fmt::Display for FootprintEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in={} staging={} out={} index={} divisor={} total={}",
            self.input_bytes,
            self.staging_bytes,
            self.output_bytes,
            self.index_bytes,
            self.divisor_bytes,
            self.total_bytes
        )
    }
}

/// Pure footprint calculator bound to one shape and capacity model.
#[derive(Debug, Clone, Copy)]
pub struct FootprintEstimator<'a> {
    shape: &'a ShapeModel,
    capacity: &'a CapacityModel,
}

impl<'a> FootprintEstimator<'a> {
    pub fn new(shape: &'a ShapeModel, capacity: &'a CapacityModel) -> Self {
        Self { shape, capacity }
    }

    pub fn estimate(&self, tile: &TileShape) -> FootprintEstimate {
        let shape = self.shape;
        let high = tile.inner(Axis::High);
        let channel = tile.inner(Axis::Channel);
        let h_out = tile.inner(Axis::Height);
        let w_out = tile.inner(Axis::Width);
        let h_in = shape.height().input_span(h_out);
        let w_in = shape.width().input_span(w_out);

        let data_width = shape.data_width();
        let out_width = shape.output_width();
        let index_width = shape.index_width();

        // The channel-adjacent (contiguous) axis is rounded up to whole
        // alignment blocks of each buffer's element type.
        let elems = |rows: u64, cols: u64, granule: u64| -> u64 {
            let plane = match shape.layout() {
                Layout::Nchw => rows.saturating_mul(align_up(cols, granule)),
                Layout::Nhwc => {
                    rows.saturating_mul(cols).saturating_mul(align_up(channel, granule))
                }
            };
            high.saturating_mul(plane)
        };

        let input_elements = elems(h_in, w_in, self.capacity.granule(data_width));
        let input_bytes = input_elements.saturating_mul(data_width);
        let output_bytes =
            elems(h_out, w_out, self.capacity.granule(out_width)).saturating_mul(out_width);
        let index_bytes = if shape.has_index() {
            elems(h_out, w_out, self.capacity.granule(index_width)).saturating_mul(index_width)
        } else {
            0
        };
        // One divisor per output position, shared by every channel.
        let divisor_bytes = if shape.needs_divisor() {
            high.saturating_mul(align_up(
                h_out.saturating_mul(w_out),
                self.capacity.granule(DIVISOR_WIDTH),
            ))
            .saturating_mul(DIVISOR_WIDTH)
        } else {
            0
        };
        let staging_bytes = if shape.has_padding() { input_bytes } else { 0 };

        let total_bytes = input_bytes
            .saturating_add(staging_bytes)
            .saturating_add(output_bytes)
            .saturating_add(index_bytes)
            .saturating_add(divisor_bytes)
            .saturating_add(self.capacity.tile_overhead_bytes())
            .saturating_mul(DOUBLE_BUFFER);

        FootprintEstimate {
            input_elements,
            input_bytes,
            staging_bytes,
            output_bytes,
            index_bytes,
            divisor_bytes,
            total_bytes,
        }
    }

    /// Capacity predicate for an estimate already in hand.
    pub fn within_capacity(&self, estimate: &FootprintEstimate) -> bool {
        estimate.total_bytes <= self.capacity.buffer_budget_bytes()
            && estimate.input_elements <= self.capacity.max_input_elements()
    }

    /// Capacity predicate: the tile fits the per-lane budget and the input
    /// element cap.
    pub fn fits(&self, tile: &TileShape) -> bool {
        self.within_capacity(&self.estimate(tile))
    }
}
