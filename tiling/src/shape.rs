//! Runtime shape descriptors and shape completion.
//!
//! Completion right-aligns every input to a common rank, padding leading axes with 1, and
//! derives the broadcast output shape:
//!
//! ```text
//! [5824]      -> [1, 5824]
//! [100, 1]    -> [100, 1]
//! output      =  [100, 5824]
//! ```

use smallvec::SmallVec;
use snafu::ensure;
use vectile_dtype::DType;

use crate::error::*;

/// Maximum supported rank, before and after fusion.
pub const MAX_DIM_LEN: usize = 16;

/// Shape type. Inline up to [`MAX_DIM_LEN`], which is checked at completion.
pub type Dims = SmallVec<[i64; MAX_DIM_LEN]>;

/// Input tensor as seen by the tiling engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    pub shape: Dims,
    pub dtype: DType,
}

impl TensorDesc {
    pub fn new(shape: impl IntoIterator<Item = i64>, dtype: DType) -> Self {
        Self { shape: shape.into_iter().collect(), dtype }
    }
}

/// Output tensor; its shape may not be known before tiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDesc {
    pub shape: Option<Dims>,
    pub dtype: DType,
}

impl OutputDesc {
    pub fn new(dtype: DType) -> Self {
        Self { shape: None, dtype }
    }

    pub fn with_shape(shape: impl IntoIterator<Item = i64>, dtype: DType) -> Self {
        Self { shape: Some(shape.into_iter().collect()), dtype }
    }
}

/// Everything the engine reads from one operator execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeShapes {
    pub inputs: Vec<TensorDesc>,
    pub outputs: Vec<OutputDesc>,
    /// Scalar attribute values referenced by emission lists and bank signatures.
    pub attrs: Vec<i64>,
}

impl RuntimeShapes {
    pub fn new(inputs: Vec<TensorDesc>, outputs: Vec<OutputDesc>) -> Self {
        Self { inputs, outputs, attrs: Vec::new() }
    }

    pub fn with_attrs(mut self, attrs: Vec<i64>) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Inputs right-aligned to a common rank, plus the broadcast output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedShapes {
    pub inputs: Vec<Dims>,
    pub output: Dims,
    /// Widest input dtype.
    pub in_dtype: DType,
    /// Widest output dtype.
    pub out_dtype: DType,
    pub out_dtypes: SmallVec<[DType; 2]>,
}

impl CompletedShapes {
    pub fn rank(&self) -> usize {
        self.output.len()
    }

    /// True when any output axis is zero.
    pub fn is_empty(&self) -> bool {
        self.output.contains(&0)
    }

    /// Output element count, verified to fit in `i32`.
    pub fn checked_output_size(&self) -> Result<i64> {
        let size = self.output.iter().try_fold(1i64, |acc, &dim| acc.checked_mul(dim));
        match size {
            Some(size) if size <= i64::from(i32::MAX) => Ok(size),
            _ => OutputSizeOverflowSnafu { shape: self.output.to_vec() }.fail(),
        }
    }
}

/// Pad `shape` with leading ones up to `rank`.
pub fn right_align(shape: &[i64], rank: usize) -> Dims {
    let mut aligned = Dims::new();
    aligned.extend(std::iter::repeat_n(1, rank.saturating_sub(shape.len())));
    aligned.extend_from_slice(shape);
    aligned
}

/// Complete all input shapes to a common rank and compute the broadcast output.
///
/// # Errors
///
/// - no inputs or no outputs
/// - rank above [`MAX_DIM_LEN`] or a negative dimension
/// - two non-one extents on the same axis, or any broadcasting when `support_broadcast` is off
/// - a caller-provided output shape that differs from the computed one
pub fn complete_shapes(shapes: &RuntimeShapes, support_broadcast: bool) -> Result<CompletedShapes> {
    ensure!(!shapes.inputs.is_empty(), NoInputsSnafu);
    ensure!(!shapes.outputs.is_empty(), NoOutputsSnafu);

    // Rank-0 tensors are scalars; they complete to `[1]`.
    let rank = shapes.inputs.iter().map(|input| input.shape.len()).max().unwrap_or(0).max(1);
    ensure!(rank <= MAX_DIM_LEN, RankExceededSnafu { rank, max: MAX_DIM_LEN });

    let mut inputs = Vec::with_capacity(shapes.inputs.len());
    for (input, desc) in shapes.inputs.iter().enumerate() {
        if let Some((axis, &dim)) = desc.shape.iter().enumerate().find(|(_, dim)| **dim < 0) {
            return NegativeDimSnafu { input, axis, dim }.fail();
        }
        inputs.push(right_align(&desc.shape, rank));
    }

    let output = broadcast_output(&inputs, rank)?;

    if !support_broadcast
        && let Some(input) = inputs.iter().position(|shape| *shape != output)
    {
        return BroadcastUnsupportedSnafu { input }.fail();
    }

    for desc in &shapes.outputs {
        if let Some(shape) = &desc.shape {
            let actual = right_align(shape, rank);
            ensure!(
                actual == output,
                OutputShapeMismatchSnafu { expected: output.to_vec(), actual: shape.to_vec() }
            );
        }
    }

    let in_dtype = DType::widest(shapes.inputs.iter().map(|input| input.dtype)).ok_or(Error::NoInputs)?;
    let out_dtypes: SmallVec<[DType; 2]> = shapes.outputs.iter().map(|output| output.dtype).collect();
    let out_dtype = DType::widest(out_dtypes.iter().copied()).ok_or(Error::NoOutputs)?;

    Ok(CompletedShapes { inputs, output, in_dtype, out_dtype, out_dtypes })
}

/// Per axis: the common non-one extent, or 1 when every input is 1.
fn broadcast_output(inputs: &[Dims], rank: usize) -> Result<Dims> {
    let mut output = Dims::with_capacity(rank);
    for axis in 0..rank {
        let mut extent = 1;
        for shape in inputs {
            let dim = shape[axis];
            if dim == 1 {
                continue;
            }
            ensure!(extent == 1 || extent == dim, BroadcastMismatchSnafu { axis, lhs: extent, rhs: dim });
            extent = dim;
        }
        output.push(extent);
    }
    Ok(output)
}
