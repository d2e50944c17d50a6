//! Tensor data types understood by the vectile tiling engine.
//!
//! The set of types is closed. Byte widths and alignment counts are `const fn` lookups.

#[cfg(feature = "proptest")]
mod proptest_gen;


use strum::IntoEnumIterator;

/// Element data type of a tensor.
///
/// The discriminant doubles as the index into per-dtype tables (see [`DType::index`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum DType {
    Bool = 0,

    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,

    Float16 = 9,
    BFloat16 = 10,
    Float32 = 11,
    Float64 = 12,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Position of this dtype in per-dtype tables.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Number of elements of this dtype that fill one alignment block of `block_bytes`.
    ///
    /// Returns 0 when the block cannot hold a single element.
    pub const fn elems_per_block(&self, block_bytes: usize) -> usize {
        block_bytes / self.bytes()
    }

    /// Widest dtype (by byte width) in `dtypes`. The first one wins on ties.
    ///
    /// ```rust
    /// # use vectile_dtype::DType;
    /// let widest = DType::widest([DType::Float16, DType::Int32, DType::Float32]);
    /// assert_eq!(widest, Some(DType::Int32));
    /// ```
    pub fn widest(dtypes: impl IntoIterator<Item = Self>) -> Option<Self> {
        dtypes.into_iter().fold(None, |widest, dtype| match widest {
            Some(w) if w.bytes() >= dtype.bytes() => Some(w),
            _ => Some(dtype),
        })
    }

    /// All dtypes, in discriminant order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}
