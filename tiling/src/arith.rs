//! Integer helpers for positive tiling quantities.
//!
//! Callers guarantee positive divisors; every call site checks with `ensure!` first.

pub(crate) fn ceil_div(value: i64, divisor: i64) -> i64 {
    debug_assert!(divisor > 0);
    (value + divisor - 1) / divisor
}

pub(crate) fn round_up(value: i64, multiple: i64) -> i64 {
    ceil_div(value, multiple) * multiple
}

pub(crate) fn round_down(value: i64, multiple: i64) -> i64 {
    debug_assert!(multiple > 0);
    value / multiple * multiple
}

/// Product of the extents after `axis`.
pub(crate) fn inner_product(dims: &[i64], axis: usize) -> i64 {
    dims.iter().skip(axis + 1).product()
}
