use snafu::Snafu;
use vectile_dtype::DType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------
    /// Required compile info field is absent.
    #[snafu(display("compile info field `{field}` is missing"))]
    MissingField { field: &'static str },

    /// Compile info field is present but unusable.
    #[snafu(display("compile info field `{field}` is malformed: {reason}"))]
    MalformedField { field: &'static str, reason: String },

    /// No capacity tuple registered for a pattern key.
    #[snafu(display("no capacity entry for pattern key \"{key}\""))]
    MissingCapacity { key: String },

    /// Capacity tuple has the wrong number of values.
    #[snafu(display("capacity entry for pattern key \"{key}\" has {len} values, expected 4"))]
    CapacityArity { key: String, len: usize },

    /// Emission lists exist but none for the chosen key.
    #[snafu(display("no emission list registered for tiling key {key}"))]
    MissingEmissionList { key: u64 },

    /// Emission instruction code outside every token range.
    #[snafu(display("invalid emission code {code}"))]
    InvalidEmissionCode { code: i64 },

    /// Const-shape mode without a matching shape.
    #[snafu(display("output shape {shape:?} does not match any const shape"))]
    ConstShapeNotFound { shape: Vec<i64> },

    /// Alignment unit cannot hold one element of a dtype.
    #[snafu(display("alignment unit of {block_bytes} bytes cannot hold one {dtype} element"))]
    AlignmentTooSmall { block_bytes: i64, dtype: DType },

    /// Runtime dtype wider than the kernel was compiled for.
    #[snafu(display("dtype {dtype} is wider than the {max_bytes} bytes the kernel was compiled for"))]
    DTypeTooWide { dtype: DType, max_bytes: i64 },

    // ------------------------------------------------------------------
    // Shapes
    // ------------------------------------------------------------------
    #[snafu(display("tiling requires at least one input"))]
    NoInputs,

    #[snafu(display("tiling requires at least one output"))]
    NoOutputs,

    /// Rank exceeds the supported maximum.
    #[snafu(display("rank {rank} exceeds maximum supported rank {max}"))]
    RankExceeded { rank: usize, max: usize },

    /// Negative dimension in an input shape.
    #[snafu(display("input {input} has negative dimension {dim} at axis {axis}"))]
    NegativeDim { input: usize, axis: usize, dim: i64 },

    /// Two non-one extents disagree on one axis.
    #[snafu(display("cannot broadcast axis {axis}: {lhs} vs {rhs}"))]
    BroadcastMismatch { axis: usize, lhs: i64, rhs: i64 },

    /// Input differs from the output shape while broadcasting is disabled.
    #[snafu(display("input {input} needs broadcasting but the operator is elementwise only"))]
    BroadcastUnsupported { input: usize },

    /// Caller-provided output shape disagrees with the broadcast result.
    #[snafu(display("output shape mismatch: expected {expected:?}, got {actual:?}"))]
    OutputShapeMismatch { expected: Vec<i64>, actual: Vec<i64> },

    /// Output element count outside the i32 range.
    #[snafu(display("output shape {shape:?} has more elements than fit in i32"))]
    OutputSizeOverflow { shape: Vec<i64> },

    // ------------------------------------------------------------------
    // Arithmetic safety
    // ------------------------------------------------------------------
    /// A divisor evaluated to zero.
    #[snafu(display("{what} evaluated to zero"))]
    ZeroDivisor { what: &'static str },

    /// An emitted value references an axis that was never chosen.
    #[snafu(display("{what} axis was requested but never set"))]
    UnsetAxis { what: &'static str },

    /// An emitted value references a different axis than the one chosen.
    #[snafu(display("{what} axis mismatch: tiling chose {expected}, emission asks for {actual}"))]
    AxisMismatch { what: &'static str, expected: usize, actual: usize },

    /// A value does not fit in the emitted i32.
    #[snafu(display("value {value} does not fit in i32"))]
    ValueOverflow { value: i64 },

    /// Index outside its table.
    #[snafu(display("{what} index {index} out of range for length {len}"))]
    IndexOutOfRange { what: &'static str, index: usize, len: usize },
}
