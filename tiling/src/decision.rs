use crate::bank::BankSolution;
use crate::block::BlockTiling;
use crate::pattern::Pattern;
use crate::shape::Dims;
use crate::ub::UbTiling;

/// Everything the runtime needs to launch the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TilingDecision {
    pub pattern: Pattern,
    pub double_buffer: bool,
    pub block_axis: Option<usize>,
    pub block_factor: i64,
    /// Number of units launched, at least 1.
    pub block_dims: i64,
    pub ub_axis: Option<usize>,
    pub ub_factor: i64,
    pub tiling_key: Option<u64>,
    pub tiling_data: Vec<i32>,
    /// Output shape after completion, before fusion.
    pub output_shape: Dims,
}

impl TilingDecision {
    /// Single unit, no split, no key yet.
    pub fn new(pattern: Pattern, output_shape: Dims) -> Self {
        Self {
            pattern,
            double_buffer: false,
            block_axis: None,
            block_factor: 0,
            block_dims: 1,
            ub_axis: None,
            ub_factor: 0,
            tiling_key: None,
            tiling_data: Vec::new(),
            output_shape,
        }
    }

    pub fn apply_block(&mut self, block: &BlockTiling) {
        self.block_axis = block.axis;
        self.block_factor = block.factor;
        self.block_dims = block.units.max(1);
    }

    pub fn apply_ub(&mut self, ub: &UbTiling) {
        self.ub_axis = Some(ub.axis);
        self.ub_factor = ub.factor;
        self.double_buffer = ub.double_buffer;
    }

    pub fn apply_bank(&mut self, solution: &BankSolution) {
        self.block_axis = Some(solution.block_axis);
        self.block_factor = solution.block_factor;
        self.block_dims = solution.block_dims;
        self.ub_axis = Some(solution.ub_axis);
        self.ub_factor = solution.ub_factor;
        self.double_buffer = solution.double_buffer;
        self.tiling_key = Some(solution.tiling_key);
    }

    /// Block axis as emitted in axis/factor-only mode, `-1` when unset.
    pub fn block_axis_code(&self) -> i64 {
        self.block_axis.map_or(-1, |axis| axis as i64)
    }

    pub fn ub_axis_code(&self) -> i64 {
        self.ub_axis.map_or(-1, |axis| axis as i64)
    }
}
