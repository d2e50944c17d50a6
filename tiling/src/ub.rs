//! Per-unit buffer (UB) tiling.
//!
//! Each unit owns the slice `[block_factor, output[block_axis + 1..]]`. Axes are committed
//! from the innermost outward while the pass still fits the buffer; the first axis that does
//! not fit is split.
//!
//! ```text
//! slice [4, 5824], limit 10920
//! axis 1: 5824 fits, committed 5824
//! axis 0: 4 > 10920 / 5824 -> split, factor 1 -> moved to axis 1, factor 5824
//! ```
//!
//! The raw factor is then adjusted:
//! - on the last axis it is rounded to whole alignment blocks
//! - a tail pass smaller than one block is avoided by balancing passes
//! - broadcast-heavy shapes may move the split to a cheaper axis

use snafu::ensure;
use tracing::debug;

use crate::arith::{ceil_div, inner_product, round_down, round_up};
use crate::capacity::Capacity;
use crate::error::*;

/// Rows at least this long make a broadcast axis worth iterating on its own.
pub const LARGE_BROADCAST_ROW: i64 = 1024;

// Retargeting keeps at least 2/3 of the original pass size.
const RETARGET_KEEP_NUM: i64 = 2;
const RETARGET_KEEP_DEN: i64 = 3;

/// Result of buffer tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UbTiling {
    pub axis: usize,
    pub factor: i64,
    pub double_buffer: bool,
}

/// Inputs to [`ub_tiling`].
#[derive(Debug, Clone, Copy)]
pub struct UbRequest<'a> {
    pub output: &'a [i64],
    pub broadcast_axis: &'a [bool],
    /// Block axis, or 0 without a block split.
    pub start_axis: usize,
    /// Extent of `start_axis` owned by one unit.
    pub start_extent: i64,
    pub capacity: Capacity,
    pub elems_per_block: i64,
    pub broadcast_opt: bool,
}

impl UbRequest<'_> {
    fn extent(&self, axis: usize) -> i64 {
        if axis == self.start_axis { self.start_extent } else { self.output[axis] }
    }

    fn is_last(&self, axis: usize) -> bool {
        axis + 1 == self.output.len()
    }

    fn is_broadcast(&self, axis: usize) -> bool {
        self.broadcast_axis.get(axis).copied().unwrap_or(false)
    }
}

pub fn ub_tiling(request: &UbRequest<'_>) -> Result<UbTiling> {
    let rank = request.output.len();
    ensure!(
        request.start_axis < rank,
        IndexOutOfRangeSnafu { what: "buffer start axis", index: request.start_axis, len: rank }
    );
    ensure!(request.start_extent > 0, ZeroDivisorSnafu { what: "block factor" });
    ensure!(request.elems_per_block > 0, ZeroDivisorSnafu { what: "elements per block" });

    let per_unit = request.start_extent * inner_product(request.output, request.start_axis);
    let double_buffer = per_unit > request.capacity.max_ub;
    let limit = request.capacity.ub_limit(double_buffer);

    let mut committed = 1i64;
    let mut split = None;
    for axis in (request.start_axis..rank).rev() {
        let dim = request.extent(axis);
        ensure!(dim > 0, ZeroDivisorSnafu { what: "output extent" });
        let budget = limit / committed;
        if dim > budget {
            split = Some((axis, budget));
            break;
        }
        committed *= dim;
    }

    let (mut axis, mut factor) = split.unwrap_or((request.start_axis, request.start_extent));
    // One step of a non-last axis is the same pass as the whole next axis.
    if split.is_some() && factor == 1 && !request.is_last(axis) {
        axis += 1;
        factor = request.extent(axis);
    }
    let dim = request.extent(axis);
    let row = inner_product(request.output, axis);
    ensure!(factor > 0, ZeroDivisorSnafu { what: "buffer factor" });

    if factor < dim {
        if request.is_last(axis) {
            factor = align_last_axis(dim, factor, limit, request.elems_per_block);
        }
        factor = balance_tail(dim, factor, row, request.elems_per_block, request.is_last(axis));
    }

    let mut tiling = UbTiling { axis, factor, double_buffer };
    if request.broadcast_opt {
        tiling = retarget_lowest_middle(request, tiling, limit);
        tiling = shrink_middle_broadcast(request, tiling, limit);
    }

    debug!(axis = tiling.axis, factor = tiling.factor, double_buffer, limit, "buffer tiling");
    Ok(tiling)
}

/// Whole blocks per pass on the last axis; an exact split is left alone.
fn align_last_axis(dim: i64, factor: i64, budget: i64, elems_per_block: i64) -> i64 {
    if dim % factor == 0 {
        return factor;
    }
    let up = round_up(factor, elems_per_block);
    if up <= budget {
        return up;
    }
    let down = round_down(factor, elems_per_block);
    if down > 0 { down } else { factor }
}

/// Spread the work evenly when the last pass would cover less than one block.
fn balance_tail(dim: i64, factor: i64, row: i64, elems_per_block: i64, last_axis: bool) -> i64 {
    let tail = dim % factor;
    if tail == 0 || tail * row >= elems_per_block {
        return factor;
    }
    let passes = ceil_div(dim, factor);
    let mut balanced = ceil_div(dim, passes);
    if last_axis {
        balanced = round_up(balanced, elems_per_block);
    }
    balanced.min(factor)
}

/// Move the split onto the innermost large, aligned broadcast axis inside the pass, as long as
/// the pass does not shrink by more than a third.
fn retarget_lowest_middle(request: &UbRequest<'_>, tiling: UbTiling, limit: i64) -> UbTiling {
    let rank = request.output.len();
    let candidate = (tiling.axis + 1..rank.saturating_sub(1)).rev().find(|&axis| {
        let row = inner_product(request.output, axis);
        request.is_broadcast(axis) && row % request.elems_per_block == 0 && row >= LARGE_BROADCAST_ROW
    });
    let Some(axis) = candidate else {
        return tiling;
    };

    let row = inner_product(request.output, axis);
    let factor = request.output[axis].min(limit / row);
    if factor < 1 {
        return tiling;
    }

    let old_tile = tiling.factor * inner_product(request.output, tiling.axis);
    let new_tile = factor * row;
    if new_tile * RETARGET_KEEP_DEN < old_tile * RETARGET_KEEP_NUM {
        return tiling;
    }

    debug!(from = tiling.axis, to = axis, factor, "buffer split moved to broadcast axis");
    UbTiling { axis, factor, ..tiling }
}

/// A short unaligned row under a broadcast axis is padded per repeat; size the pass for the
/// padded row.
fn shrink_middle_broadcast(request: &UbRequest<'_>, tiling: UbTiling, limit: i64) -> UbTiling {
    if request.is_last(tiling.axis) || !request.is_broadcast(tiling.axis) {
        return tiling;
    }
    let row = inner_product(request.output, tiling.axis);
    if row % request.elems_per_block == 0 || row >= LARGE_BROADCAST_ROW {
        return tiling;
    }

    let fit = (limit / round_up(row, request.elems_per_block)).max(1);
    if fit >= tiling.factor {
        return tiling;
    }
    debug!(axis = tiling.axis, factor = fit, "buffer factor shrunk for padded broadcast row");
    UbTiling { factor: fit, ..tiling }
}
