//! Integer helpers used throughout tile planning.
//!
//! All planning arithmetic is unsigned 64-bit and rounds up; no floating
//! point is involved anywhere.

/// Ceiling division. `ceil_div(n, 0)` returns `n` so callers never panic on
/// a degenerate divisor.
#[inline]
#[must_use]
pub const fn ceil_div(n: u64, d: u64) -> u64 {
    if d == 0 {
        return n;
    }
    n / d + (n % d != 0) as u64
}

/// Round `value` up to the next multiple of `multiple` (identity for 0).
///
/// Saturates at the largest multiple that fits in `u64`.
#[inline]
#[must_use]
pub const fn align_up(value: u64, multiple: u64) -> u64 {
    if multiple == 0 {
        return value;
    }
    let remainder = value % multiple;
    if remainder == 0 {
        value
    } else {
        match value.checked_add(multiple - remainder) {
            Some(v) => v,
            None => (u64::MAX / multiple) * multiple,
        }
    }
}

/// Round `value` down to a multiple of `multiple` (0 for a 0 multiple).
#[inline]
#[must_use]
pub const fn align_down(value: u64, multiple: u64) -> u64 {
    if multiple == 0 {
        return 0;
    }
    (value / multiple) * multiple
}
