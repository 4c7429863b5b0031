//! Normalized workload geometry.
//!
//! A [`PoolWorkload`] is the validated shape/attribute record handed over by
//! the op entry point. [`ShapeModel::new`] derives the output extents with
//! the sliding-window formula, folds the layout into the four planning axes
//! and computes the `has_padding` / `has_overlap` flags once.

use std::fmt;

use pooltile_common::{ConfigurationError, Result, ceil_div};
use serde::{Deserialize, Serialize};

use crate::tile::Axis;

// ---------------------------------------------------------------------------
// Input record
// ---------------------------------------------------------------------------

/// Memory layout of the data tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Channels-first; N and C fuse into the high axis, W is contiguous.
    Nchw,
    /// Channels-last; N is the high axis, C is contiguous.
    Nhwc,
}

impl Layout {
    pub(crate) fn code(self) -> u64 {
        match self {
            Layout::Nchw => 0,
            Layout::Nhwc => 1,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Nchw => write!(f, "NCHW"),
            Layout::Nhwc => write!(f, "NHWC"),
        }
    }
}

/// Whether the tile feeds the forward reduction or its gradient scatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    /// Gradients accumulate in a 32-bit buffer before the final cast.
    Backward,
}

impl Direction {
    pub(crate) fn code(self) -> u64 {
        match self {
            Direction::Forward => 0,
            Direction::Backward => 1,
        }
    }
}

/// Reduction applied over each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolMode {
    /// Keeps an argmax index per output element.
    #[default]
    Max,
    /// Divides by the window size; `count_include_pad` counts padded
    /// positions in the divisor.
    Avg {
        #[serde(default)]
        count_include_pad: bool,
    },
}

impl PoolMode {
    pub(crate) fn code(self) -> u64 {
        match self {
            PoolMode::Max => 0,
            PoolMode::Avg { .. } => 1,
        }
    }
}

/// Window attributes of one spatial axis as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowParams {
    pub input: u64,
    pub window: u64,
    pub stride: u64,
    #[serde(default = "one")]
    pub dilation: u64,
    /// Symmetric padding applied to both ends of the axis.
    #[serde(default)]
    pub pad: u64,
}

fn one() -> u64 {
    1
}

impl WindowParams {
    /// Unpadded, undilated window.
    pub fn new(input: u64, window: u64, stride: u64) -> Self {
        Self { input, window, stride, dilation: 1, pad: 0 }
    }

    pub fn with_pad(mut self, pad: u64) -> Self {
        self.pad = pad;
        self
    }

    pub fn with_dilation(mut self, dilation: u64) -> Self {
        self.dilation = dilation;
        self
    }
}

/// Validated description of one pooling invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWorkload {
    pub layout: Layout,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub mode: PoolMode,
    pub batch: u64,
    pub channels: u64,
    pub height: WindowParams,
    pub width: WindowParams,
    /// Bytes per element of the data buffer.
    pub data_width: u64,
    /// Bytes per element of the index (argmax) buffer.
    pub index_width: u64,
    #[serde(default)]
    pub ceil_mode: bool,
}

// ---------------------------------------------------------------------------
// Normalized model
// ---------------------------------------------------------------------------

/// One spatial axis with its derived output extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialAxis {
    pub input: u64,
    pub output: u64,
    pub window: u64,
    pub stride: u64,
    pub dilation: u64,
    pub pad: u64,
}

impl SpatialAxis {
    fn new(name: &'static str, p: WindowParams, ceil_mode: bool) -> Result<Self> {
        for (field, value) in [
            ("input", p.input),
            ("window", p.window),
            ("stride", p.stride),
            ("dilation", p.dilation),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroValue { axis: name, field }.into());
            }
        }
        if p.pad > p.window / 2 {
            return Err(ConfigurationError::PaddingTooLarge {
                axis: name,
                pad: p.pad,
                window: p.window,
            }
            .into());
        }

        let effective = p.dilation.saturating_mul(p.window - 1).saturating_add(1);
        let padded_input = p.input.saturating_add(p.pad.saturating_mul(2));
        if effective > padded_input {
            return Err(ConfigurationError::WindowExceedsInput {
                axis: name,
                window: effective,
                padded_input,
            }
            .into());
        }

        let span = padded_input - effective;
        let steps = if ceil_mode { ceil_div(span, p.stride) } else { span / p.stride };
        let mut output = steps + 1;
        // The last window has to start inside the input or its left padding.
        if ceil_mode && (output - 1).saturating_mul(p.stride) >= p.input.saturating_add(p.pad) {
            output -= 1;
        }
        if output == 0 {
            return Err(ConfigurationError::EmptyOutput { axis: name }.into());
        }

        Ok(Self {
            input: p.input,
            output,
            window: p.window,
            stride: p.stride,
            dilation: p.dilation,
            pad: p.pad,
        })
    }

    /// Receptive field of a single output element, saturating at `u64::MAX`.
    pub fn effective_window(&self) -> u64 {
        self.dilation.saturating_mul(self.window.saturating_sub(1)).saturating_add(1)
    }

    /// Whether the last window reaches past the right padding.
    pub fn overhangs_padding(&self) -> bool {
        let last_end = self
            .output
            .saturating_sub(1)
            .saturating_mul(self.stride)
            .saturating_add(self.effective_window());
        last_end > self.input.saturating_add(self.pad.saturating_mul(2))
    }

    /// Whether neighbouring windows share input elements.
    pub fn has_overlap(&self) -> bool {
        self.effective_window() > self.stride
    }

    /// Input elements needed to produce `output_tile` consecutive outputs,
    /// clamped to the axis extent.
    pub fn input_span(&self, output_tile: u64) -> u64 {
        output_tile
            .saturating_sub(1)
            .saturating_mul(self.stride)
            .saturating_add(self.effective_window())
            .min(self.input)
    }
}

/// Immutable geometry of one planning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeModel {
    layout: Layout,
    direction: Direction,
    mode: PoolMode,
    batch: u64,
    channels: u64,
    height: SpatialAxis,
    width: SpatialAxis,
    data_width: u64,
    index_width: u64,
    has_padding: bool,
    has_overlap: bool,
    needs_divisor: bool,
}

impl ShapeModel {
    /// Normalize and re-check a workload record.
    pub fn new(workload: &PoolWorkload) -> Result<Self> {
        if workload.batch == 0 {
            return Err(ConfigurationError::ZeroValue { axis: "high", field: "batch" }.into());
        }
        if workload.channels == 0 {
            return Err(ConfigurationError::ZeroValue { axis: "channel", field: "channels" }.into());
        }
        for width in [workload.data_width, workload.index_width] {
            if !matches!(width, 1 | 2 | 4 | 8) {
                return Err(ConfigurationError::UnsupportedElementWidth(width).into());
            }
        }
        if workload.index_width < workload.data_width {
            return Err(ConfigurationError::IndexNarrowerThanData {
                index: workload.index_width,
                data: workload.data_width,
            }
            .into());
        }

        let height = SpatialAxis::new("height", workload.height, workload.ceil_mode)?;
        let width = SpatialAxis::new("width", workload.width, workload.ceil_mode)?;
        let has_padding = height.pad > 0 || width.pad > 0;
        let has_overlap = height.has_overlap() || width.has_overlap();
        // Without padding, or when every window counts its padded positions
        // and none runs past the padding, the divisor is the window size.
        let needs_divisor = match workload.mode {
            PoolMode::Max => false,
            PoolMode::Avg { count_include_pad } => {
                has_padding
                    && !(count_include_pad
                        && !height.overhangs_padding()
                        && !width.overhangs_padding())
            }
        };

        Ok(Self {
            layout: workload.layout,
            direction: workload.direction,
            mode: workload.mode,
            batch: workload.batch,
            channels: workload.channels,
            height,
            width,
            data_width: workload.data_width,
            index_width: workload.index_width,
            has_padding,
            has_overlap,
            needs_divisor,
        })
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

    /// Max pooling writes an argmax index next to every output element.
    pub fn has_index(&self) -> bool {
        self.mode == PoolMode::Max
    }

    /// Average pooling with a per-output divisor buffer.
    pub fn needs_divisor(&self) -> bool {
        self.needs_divisor
    }

    pub fn height(&self) -> &SpatialAxis {
        &self.height
    }

    pub fn width(&self) -> &SpatialAxis {
        &self.width
    }

    pub fn data_width(&self) -> u64 {
        self.data_width
    }

    pub fn index_width(&self) -> u64 {
        self.index_width
    }

    /// Bytes per element of the output buffer.
    pub fn output_width(&self) -> u64 {
        match self.direction {
            Direction::Forward => self.data_width,
            Direction::Backward => self.data_width.max(4),
        }
    }

    pub fn has_padding(&self) -> bool {
        self.has_padding
    }

    pub fn has_overlap(&self) -> bool {
        self.has_overlap
    }

    /// Stride-aligned tiles are only safe without padding or overlap.
    pub fn is_stride_aligned(&self) -> bool {
        !self.has_padding && !self.has_overlap
    }

    /// Total output extent of a planning axis.
    pub fn extent(&self, axis: Axis) -> u64 {
        match (axis, self.layout) {
            (Axis::High, Layout::Nchw) => self.batch.saturating_mul(self.channels),
            (Axis::High, Layout::Nhwc) => self.batch,
            (Axis::Height, _) => self.height.output,
            (Axis::Width, _) => self.width.output,
            (Axis::Channel, Layout::Nchw) => 1,
            (Axis::Channel, Layout::Nhwc) => self.channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload(height: WindowParams, width: WindowParams) -> PoolWorkload {
        PoolWorkload {
            layout: Layout::Nchw,
            direction: Direction::Forward,
            mode: PoolMode::Max,
            batch: 2,
            channels: 16,
            height,
            width,
            data_width: 2,
            index_width: 4,
            ceil_mode: false,
        }
    }

    #[test]
    fn output_extent_floor_mode() {
        let shape = ShapeModel::new(&workload(
            WindowParams::new(32, 3, 1),
            WindowParams::new(16, 3, 2),
        ))
        .unwrap();
        assert_eq!(shape.height().output, 30);
        assert_eq!(shape.width().output, 7);
        assert!(shape.has_overlap());
        assert!(!shape.has_padding());
    }

    #[test]
    fn output_extent_ceil_mode() {
        let mut w = workload(WindowParams::new(5, 2, 2), WindowParams::new(4, 2, 2));
        w.ceil_mode = true;
        let shape = ShapeModel::new(&w).unwrap();
        assert_eq!(shape.height().output, 3);
        assert_eq!(shape.width().output, 2);
    }

    #[test]
    fn ceil_mode_drops_window_starting_in_right_padding() {
        // span = 4 + 2 - 2 = 4, ceil(4/3) + 1 = 3; the third window would
        // start at 6 >= input + pad = 5, so it is dropped.
        let mut w = workload(
            WindowParams::new(4, 2, 3).with_pad(1),
            WindowParams::new(4, 3, 2).with_pad(1),
        );
        w.ceil_mode = true;
        let shape = ShapeModel::new(&w).unwrap();
        assert_eq!(shape.height().output, 2);
        // span = 3, ceil(3/2) + 1 = 3; third window starts at 4 < 5 and stays.
        assert_eq!(shape.width().output, 3);
    }

    #[test]
    fn dilation_widens_window() {
        let shape = ShapeModel::new(&workload(
            WindowParams::new(10, 3, 3).with_dilation(2),
            WindowParams::new(10, 2, 2),
        ))
        .unwrap();
        assert_eq!(shape.height().effective_window(), 5);
        assert_eq!(shape.height().output, 2);
        assert!(shape.has_overlap());
    }

    #[test]
    fn stride_equal_window_is_aligned() {
        let shape =
            ShapeModel::new(&workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2)))
                .unwrap();
        assert!(shape.is_stride_aligned());
    }

    #[test]
    fn input_span_is_clamped() {
        let axis = SpatialAxis {
            input: 10,
            output: 8,
            window: 3,
            stride: 1,
            dilation: 1,
            pad: 0,
        };
        assert_eq!(axis.input_span(1), 3);
        assert_eq!(axis.input_span(4), 6);
        assert_eq!(axis.input_span(8), 10);
        assert_eq!(axis.input_span(100), 10);
    }

    #[test]
    fn layout_decides_high_and_channel_axes() {
        let mut w = workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2));
        let nchw = ShapeModel::new(&w).unwrap();
        assert_eq!(nchw.extent(Axis::High), 32);
        assert_eq!(nchw.extent(Axis::Channel), 1);

        w.layout = Layout::Nhwc;
        let nhwc = ShapeModel::new(&w).unwrap();
        assert_eq!(nhwc.extent(Axis::High), 2);
        assert_eq!(nhwc.extent(Axis::Channel), 16);
    }

    #[test]
    fn padding_above_half_window_rejected() {
        let err = ShapeModel::new(&workload(
            WindowParams::new(8, 3, 1).with_pad(2),
            WindowParams::new(8, 2, 2),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("height: padding 2 exceeds half of the window 3"));
    }

    #[test]
    fn zero_stride_rejected() {
        let err =
            ShapeModel::new(&workload(WindowParams::new(8, 2, 0), WindowParams::new(8, 2, 2)))
                .unwrap_err();
        assert!(err.to_string().contains("height: stride must be > 0"));
    }

    #[test]
    fn window_larger_than_input_rejected() {
        let err =
            ShapeModel::new(&workload(WindowParams::new(8, 2, 2), WindowParams::new(2, 5, 1)))
                .unwrap_err();
        assert!(err.to_string().contains("width: effective window 5 exceeds padded input 2"));
    }

    #[test]
    fn index_narrower_than_data_rejected() {
        let mut w = workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2));
        w.data_width = 4;
        w.index_width = 2;
        assert!(ShapeModel::new(&w).is_err());
    }

    #[test]
    fn odd_element_width_rejected() {
        let mut w = workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2));
        w.data_width = 3;
        w.index_width = 4;
        let err = ShapeModel::new(&w).unwrap_err();
        assert!(err.to_string().contains("unsupported element width: 3 bytes"));
    }

    #[test]
    fn backward_accumulates_in_32_bits() {
        let mut w = workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2));
        w.direction = Direction::Backward;
        let shape = ShapeModel::new(&w).unwrap();
        assert_eq!(shape.output_width(), 4);
        w.direction = Direction::Forward;
        assert_eq!(ShapeModel::new(&w).unwrap().output_width(), 2);
    }

    #[test]
    fn workload_deserializes_with_defaults() {
        let json = r#"{
            "layout": "nhwc",
            "batch": 1,
            "channels": 64,
            "height": { "input": 8, "window": 2, "stride": 2 },
            "width": { "input": 8, "window": 3, "stride": 1, "pad": 1 },
            "data_width": 4,
            "index_width": 4
        }"#;
        let w: PoolWorkload = serde_json::from_str(json).unwrap();
        assert_eq!(w.direction, Direction::Forward);
        assert_eq!(w.mode, PoolMode::Max);
        assert_eq!(w.height.dilation, 1);
        assert_eq!(w.width.pad, 1);
        assert!(!w.ceil_mode);
    }

    #[test]
    fn saturated_window_does_not_overflow() {
        let shape = ShapeModel::new(&workload(
            WindowParams::new(u64::MAX, 3, 1).with_dilation(u64::MAX),
            WindowParams::new(8, 2, 2),
        ))
        .unwrap();
        assert_eq!(shape.height().effective_window(), u64::MAX);
        assert!(shape.has_overlap());
        assert_eq!(shape.height().input_span(4), u64::MAX);
        assert!(!shape.height().overhangs_padding());
    }

    #[test]
    fn avg_mode_deserializes() {
        let mode: PoolMode =
            serde_json::from_str(r#"{ "avg": { "count_include_pad": true } }"#).unwrap();
        assert_eq!(mode, PoolMode::Avg { count_include_pad: true });
        let mode: PoolMode = serde_json::from_str(r#""max""#).unwrap();
        assert_eq!(mode, PoolMode::Max);
    }

    #[test]
    fn divisor_needed_only_for_padded_avg() {
        let padded = |mode, ceil_mode| {
            let mut w = workload(
                WindowParams::new(8, 3, 2).with_pad(1),
                WindowParams::new(8, 3, 2).with_pad(1),
            );
            w.mode = mode;
            w.ceil_mode = ceil_mode;
            ShapeModel::new(&w).unwrap()
        };
        let max = padded(PoolMode::Max, false);
        assert!(max.has_index());
        assert!(!max.needs_divisor());

        let exclude = padded(PoolMode::Avg { count_include_pad: false }, false);
        assert!(!exclude.has_index());
        assert!(exclude.needs_divisor());

        // floor mode keeps every window inside the padded input
        assert!(!padded(PoolMode::Avg { count_include_pad: true }, false).needs_divisor());

        let mut w = workload(WindowParams::new(8, 2, 2), WindowParams::new(8, 2, 2));
        w.mode = PoolMode::Avg { count_include_pad: false };
        assert!(!ShapeModel::new(&w).unwrap().needs_divisor());
    }

    #[test]
    fn ceil_mode_overhang_needs_divisor_even_with_pad_counted() {
        // input 6, pad 1, window 3, stride 2: span 5, ceil(5/2) + 1 = 4
        // windows; the last one ends at 3 * 2 + 3 = 9 > 8.
        let mut w = workload(
            WindowParams::new(6, 3, 2).with_pad(1),
            WindowParams::new(8, 2, 2),
        );
        w.mode = PoolMode::Avg { count_include_pad: true };
        w.ceil_mode = true;
        let shape = ShapeModel::new(&w).unwrap();
        assert_eq!(shape.height().output, 4);
        assert!(shape.height().overhangs_padding());
        assert!(shape.needs_divisor());
    }
}
