//! Candidate tile shapes.
//!
//! A [`TileShape`] is the mutable working state of a search: one inner
//! extent per planning axis. Outer counts and tails are derived on demand
//! with the scheduler's arithmetic, so a shape can never disagree with the
//! plan built from it.

use std::fmt;

use crate::schedule::{outer_count, tail_extent};
use crate::shape::ShapeModel;

/// Planning axes, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// Fused N×C (NCHW) or N (NHWC).
    High,
    Height,
    Width,
    /// Separate channel axis; extent 1 for NCHW.
    Channel,
}

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::High, Axis::Height, Axis::Width, Axis::Channel];

    pub(crate) const fn index(self) -> usize {
        match self {
            Axis::High => 0,
            Axis::Height => 1,
            Axis::Width => 2,
            Axis::Channel => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::High => "high",
            Axis::Height => "height",
            Axis::Width => "width",
            Axis::Channel => "channel",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inner tile extent of one axis together with the axis extent it splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisTile {
    extent: u64,
    inner: u64,
}

impl AxisTile {
    /// `inner` is clamped into `[1, extent]`.
    pub fn new(extent: u64, inner: u64) -> Self {
        let extent = extent.max(1);
        Self { extent, inner: inner.clamp(1, extent) }
    }

    pub fn extent(&self) -> u64 {
        self.extent
    }

    pub fn inner(&self) -> u64 {
        self.inner
    }

    pub fn outer(&self) -> u64 {
        outer_count(self.extent, self.inner)
    }

    pub fn tail(&self) -> u64 {
        tail_extent(self.extent, self.inner)
    }

    pub fn is_split(&self) -> bool {
        self.inner < self.extent
    }
}

/// Inner extents for all four planning axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileShape {
    axes: [AxisTile; 4],
}

impl TileShape {
    /// Every axis at its full output extent.
    pub fn unsplit(shape: &ShapeModel) -> Self {
        let axes = Axis::ALL.map(|axis| {
            let extent = shape.extent(axis);
            AxisTile::new(extent, extent)
        });
        Self { axes }
    }

    pub fn split(&mut self, axis: Axis, inner: u64) {
        let slot = &mut self.axes[axis.index()];
        *slot = AxisTile::new(slot.extent, inner);
    }

    #[must_use]
    pub fn with_split(mut self, axis: Axis, inner: u64) -> Self {
        self.split(axis, inner);
        self
    }

    pub fn axis(&self, axis: Axis) -> &AxisTile {
        &self.axes[axis.index()]
    }

    pub fn inner(&self, axis: Axis) -> u64 {
        self.axis(axis).inner
    }

    pub fn outer(&self, axis: Axis) -> u64 {
        self.axis(axis).outer()
    }

    /// Flattened tile count over all axes.
    pub fn total_tiles(&self) -> u64 {
        self.axes.iter().fold(1u64, |acc, a| acc.saturating_mul(a.outer()))
    }

    /// Tile count contributed by every axis except `axis`.
    pub fn tiles_excluding(&self, axis: Axis) -> u64 {
        Axis::ALL
            .iter()
            .filter(|&&a| a != axis)
            .fold(1u64, |acc, &a| acc.saturating_mul(self.outer(a)))
    }
}

impl fmt::Display for TileShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in Axis::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let a = self.axis(*axis);
            write!(f, "{axis}={}/{}", a.inner, a.extent)?;
        }
        Ok(())
    }
}
