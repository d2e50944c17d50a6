//! Tiling key encoding and tiling data emission.
//!
//! The tiling key selects one precompiled kernel variant:
//!
//! ```text
//! key = pattern * 100000 + (double_buffer ? 10000 : 0) + block_axis * rank + ub_axis + 1
//! ```
//!
//! The trailing axis term is present only when both axes are set. Each kernel variant
//! declares the runtime values it reads as a list of [`EmissionToken`]s, encoded as integers
//! at compile time:
//!
//! | code            | token                      |
//! |-----------------|----------------------------|
//! | `10000 + i*100 + a` | extent of input `i` at fused axis `a` |
//! | `20000 + a`     | block factor, block axis must be `a` |
//! | `30000 + a`     | buffer factor, buffer axis must be `a` |
//! | `40000 + k`     | attribute `k`              |

use snafu::{OptionExt, ensure};

use crate::decision::TilingDecision;
use crate::error::*;
use crate::fuse::CanonicalShape;
use crate::pattern::Pattern;

/// Key of the kernel that handles empty tensors.
pub const EMPTY_TENSOR_KEY: u64 = 2_147_483_647;

/// Const-shape keys are `CONST_KEY_BASE + index`.
pub const CONST_KEY_BASE: u64 = 100_000_000;

const PATTERN_KEY_STRIDE: u64 = 100_000;
const DOUBLE_BUFFER_KEY: u64 = 10_000;

const CODE_SPAN: i64 = 10_000;
const DIM_CODE: i64 = 1;
const BLOCK_FACTOR_CODE: i64 = 2;
const UB_FACTOR_CODE: i64 = 3;
const ATTR_CODE: i64 = 4;
const INPUT_STRIDE: i64 = 100;

pub fn encode_key(
    pattern: Pattern,
    double_buffer: bool,
    block_axis: Option<usize>,
    ub_axis: Option<usize>,
    rank: usize,
) -> u64 {
    let mut key = u64::from(pattern.id()) * PATTERN_KEY_STRIDE;
    if double_buffer {
        key += DOUBLE_BUFFER_KEY;
    }
    if let (Some(block), Some(ub)) = (block_axis, ub_axis) {
        key += (block * rank + ub + 1) as u64;
    }
    key
}

/// One runtime value read by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmissionToken {
    Dim { input: usize, axis: usize },
    BlockFactor { axis: usize },
    UbFactor { axis: usize },
    Attr { index: usize },
}

impl EmissionToken {
    pub fn decode(code: i64) -> Result<Self> {
        ensure!(code >= 0, InvalidEmissionCodeSnafu { code });
        let rest = (code % CODE_SPAN) as usize;
        match code / CODE_SPAN {
            DIM_CODE => Ok(Self::Dim { input: rest / INPUT_STRIDE as usize, axis: rest % INPUT_STRIDE as usize }),
            BLOCK_FACTOR_CODE => Ok(Self::BlockFactor { axis: rest }),
            UB_FACTOR_CODE => Ok(Self::UbFactor { axis: rest }),
            ATTR_CODE => Ok(Self::Attr { index: rest }),
            _ => InvalidEmissionCodeSnafu { code }.fail(),
        }
    }

    /// Inverse of [`EmissionToken::decode`]; fails when a field overflows its code range.
    pub fn encode(self) -> Result<i64> {
        let stride = INPUT_STRIDE as usize;
        let span = CODE_SPAN as usize;
        let (kind, rest) = match self {
            Self::Dim { input, axis } => {
                ensure!(input < stride, IndexOutOfRangeSnafu { what: "emission input", index: input, len: stride });
                ensure!(axis < stride, IndexOutOfRangeSnafu { what: "emission axis", index: axis, len: stride });
                (DIM_CODE, input * stride + axis)
            }
            Self::BlockFactor { axis } | Self::UbFactor { axis } => {
                ensure!(axis < span, IndexOutOfRangeSnafu { what: "emission axis", index: axis, len: span });
                (if matches!(self, Self::BlockFactor { .. }) { BLOCK_FACTOR_CODE } else { UB_FACTOR_CODE }, axis)
            }
            Self::Attr { index } => {
                ensure!(index < span, IndexOutOfRangeSnafu { what: "emission attribute", index, len: span });
                (ATTR_CODE, index)
            }
        };
        Ok(kind * CODE_SPAN + rest as i64)
    }

    fn resolve(self, decision: &TilingDecision, shape: &CanonicalShape, attrs: &[i64]) -> Result<i64> {
        match self {
            Self::Dim { input, axis } => {
                let dims = shape.inputs.get(input).context(IndexOutOfRangeSnafu {
                    what: "emission input",
                    index: input,
                    len: shape.inputs.len(),
                })?;
                dims.get(axis)
                    .copied()
                    .context(IndexOutOfRangeSnafu { what: "emission axis", index: axis, len: dims.len() })
            }
            Self::BlockFactor { axis } => {
                let chosen = decision.block_axis.context(UnsetAxisSnafu { what: "block" })?;
                ensure!(chosen == axis, AxisMismatchSnafu { what: "block", expected: chosen, actual: axis });
                Ok(decision.block_factor)
            }
            Self::UbFactor { axis } => {
                let chosen = decision.ub_axis.context(UnsetAxisSnafu { what: "buffer" })?;
                ensure!(chosen == axis, AxisMismatchSnafu { what: "buffer", expected: chosen, actual: axis });
                Ok(decision.ub_factor)
            }
            Self::Attr { index } => attrs
                .get(index)
                .copied()
                .context(IndexOutOfRangeSnafu { what: "emission attribute", index, len: attrs.len() }),
        }
    }
}

impl std::fmt::Display for EmissionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dim { input, axis } => write!(f, "_dim_{input}_{axis}"),
            Self::BlockFactor { axis } => write!(f, "_block_factor_{axis}"),
            Self::UbFactor { axis } => write!(f, "_ub_factor_{axis}"),
            Self::Attr { index } => write!(f, "_attr_{index}"),
        }
    }
}

/// Resolve every token against the decision, in order.
pub fn emit_tiling_data(
    tokens: &[EmissionToken],
    decision: &TilingDecision,
    shape: &CanonicalShape,
    attrs: &[i64],
) -> Result<Vec<i32>> {
    tokens.iter().map(|token| to_i32(token.resolve(decision, shape, attrs)?)).collect()
}

/// `[block_axis, block_factor, ub_axis, ub_factor]`, unset axes as `-1`.
pub fn axis_factor_data(decision: &TilingDecision) -> Result<Vec<i32>> {
    [decision.block_axis_code(), decision.block_factor, decision.ub_axis_code(), decision.ub_factor]
        .into_iter()
        .map(to_i32)
        .collect()
}

fn to_i32(value: i64) -> Result<i32> {
    i32::try_from(value).ok().context(ValueOverflowSnafu { value })
}
