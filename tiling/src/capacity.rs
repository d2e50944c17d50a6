//! Per-pattern hardware capacity.

use snafu::{OptionExt, ensure};
use vectile_dtype::DType;

use crate::error::*;
use crate::pattern::Pattern;
use crate::profile::CompileTimeProfile;

/// Below `elems_per_block * units * MULTI_UNIT_FACTOR` elements a single unit does the work.
pub const MULTI_UNIT_FACTOR: i64 = 2;

/// From `elems_per_block * units * BLOCK_ALIGN_FACTOR` elements, unit counts that divide the
/// split axis evenly are preferred.
pub const BLOCK_ALIGN_FACTOR: i64 = 8;

/// Capacity tuple `[units, max dtype bytes, buffer elems, double-buffered buffer elems]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub units: i64,
    pub max_dtype_bytes: i64,
    pub max_ub: i64,
    pub max_ub_db: i64,
}

impl Capacity {
    pub fn from_tuple(key: &str, tuple: &[i64]) -> Result<Self> {
        ensure!(tuple.len() == 4, CapacityAritySnafu { key, len: tuple.len() });
        let capacity = Self { units: tuple[0], max_dtype_bytes: tuple[1], max_ub: tuple[2], max_ub_db: tuple[3] };

        ensure!(capacity.units > 0, ZeroDivisorSnafu { what: "unit count" });
        ensure!(capacity.max_dtype_bytes > 0, ZeroDivisorSnafu { what: "max dtype width" });
        ensure!(capacity.max_ub > 0, ZeroDivisorSnafu { what: "buffer capacity" });
        ensure!(capacity.max_ub_db > 0, ZeroDivisorSnafu { what: "double-buffered capacity" });
        Ok(capacity)
    }

    /// Element budget of one buffer pass.
    pub fn ub_limit(&self, double_buffer: bool) -> i64 {
        if double_buffer { self.max_ub_db } else { self.max_ub }
    }

    pub fn multi_unit_threshold(&self, elems_per_block: i64) -> i64 {
        elems_per_block * self.units * MULTI_UNIT_FACTOR
    }

    pub fn block_align_threshold(&self, elems_per_block: i64) -> i64 {
        elems_per_block * self.units * BLOCK_ALIGN_FACTOR
    }

    /// Source elements may be at most `max_dtype_bytes` wide. Outputs may widen.
    pub fn check_dtype(&self, dtype: DType) -> Result<()> {
        ensure!(
            dtype.bytes() as i64 <= self.max_dtype_bytes,
            DTypeTooWideSnafu { dtype, max_bytes: self.max_dtype_bytes }
        );
        Ok(())
    }
}

/// Look up the capacity tuple compiled for `pattern`.
pub fn resolve_capacity(profile: &CompileTimeProfile, pattern: Pattern) -> Result<Capacity> {
    let key = pattern.key();
    let tuple = profile.base_info().get(&key).context(MissingCapacitySnafu { key: key.as_str() })?;
    Capacity::from_tuple(&key, tuple)
}
