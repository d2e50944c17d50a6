//! Multi-core (block) tiling.
//!
//! Walks the output from the outermost axis, handing whole axes to the remaining unit budget.
//! The first axis larger than what is left gets split; the product of everything before it
//! plus the split count is the number of units actually used.
//!
//! ```text
//! output [4, 3, 1000], 32 units
//! axis 0: 4 <= 32 -> 8 left
//! axis 1: 3 <= 8  -> 2 left
//! axis 2: 1000 > 2 -> factor 500, rounded to 504 on the last axis -> 4 * 3 * 2 = 24 units
//! ```

use snafu::ensure;
use tracing::{debug, trace};

use crate::arith::{ceil_div, inner_product, round_up};
use crate::error::*;

/// Result of multi-core tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTiling {
    /// Split axis; `None` when every axis fit into the unit budget.
    pub axis: Option<usize>,
    /// Slice length along `axis` per unit.
    pub factor: i64,
    pub units: i64,
}

impl BlockTiling {
    pub fn unsplit(units: i64) -> Self {
        Self { axis: None, factor: 0, units }
    }
}

/// Split `output` over at most `units` cores. When no axis exceeds the budget the whole
/// output goes to one unit.
///
/// With `align_units`, a unit count in `(remaining / 2, remaining]` that divides the split
/// axis is preferred, so every unit gets the same amount of work.
pub fn block_tiling(output: &[i64], units: i64, elems_per_block: i64, align_units: bool) -> Result<BlockTiling> {
    ensure!(units > 0, ZeroDivisorSnafu { what: "unit count" });
    ensure!(elems_per_block > 0, ZeroDivisorSnafu { what: "elements per block" });

    let last = output.len().saturating_sub(1);
    let mut remaining = units;
    let mut used = 1i64;

    for (axis, &dim) in output.iter().enumerate() {
        ensure!(dim > 0, ZeroDivisorSnafu { what: "output extent" });

        if dim <= remaining {
            remaining /= dim;
            used *= dim;
            trace!(axis, dim, remaining, "axis fits the unit budget");
            continue;
        }

        let aligned = if align_units { aligned_factor(dim, remaining) } else { None };
        let mut factor = aligned.unwrap_or_else(|| ceil_div(dim, remaining));
        if axis == last {
            factor = round_up(factor, elems_per_block).min(dim);
        }
        let tiling = BlockTiling { axis: Some(axis), factor, units: used * ceil_div(dim, factor) };
        debug!(axis, factor, units = tiling.units, aligned = aligned.is_some(), "block tiling");
        return Ok(tiling);
    }

    debug!(elements = used, "no axis exceeds the unit budget, using one unit");
    Ok(BlockTiling::unsplit(1))
}

fn aligned_factor(dim: i64, remaining: i64) -> Option<i64> {
    (remaining / 2 + 1..=remaining).rev().find(|units| dim % units == 0).map(|units| dim / units)
}

/// With several outputs every unit must write at least one aligned block of each; otherwise
/// neighboring units race on the same block and the work falls back to a single unit.
pub fn enforce_output_alignment(block: BlockTiling, output: &[i64], out_elems_per_block: &[i64]) -> BlockTiling {
    let Some(axis) = block.axis else {
        return block;
    };
    if out_elems_per_block.len() < 2 || block.units <= 1 {
        return block;
    }

    let slice = block.factor * inner_product(output, axis);
    if out_elems_per_block.iter().any(|&elems| slice < elems) {
        debug!(slice, "per-unit slice smaller than an output block, using one unit");
        return BlockTiling::unsplit(1);
    }
    block
}
