//! Shared fixtures for tiling tests.
//!
//! The standard profile mirrors a 32-unit device with a 32-byte alignment unit: every pattern
//! key maps to `[32, 4, 21840, 10920]`, so fp32 has 8 elements per block.

use std::collections::HashMap;

use vectile_dtype::DType;

use crate::profile::{CompileTimeProfile, TilingFlags};
use crate::shape::{OutputDesc, RuntimeShapes, TensorDesc};

pub const STANDARD_CAPACITY: [i64; 4] = [32, 4, 21840, 10920];

pub const ALL_PATTERN_KEYS: &[&str] = &["000", "100", "120", "121", "200", "210", "230", "320", "999"];

pub fn base_info(keys: &[&str], capacity: [i64; 4]) -> HashMap<String, Vec<i64>> {
    keys.iter().map(|key| (key.to_string(), capacity.to_vec())).collect()
}

/// Broadcast and special patterns on, no dynamic fallback.
pub fn static_flags() -> TilingFlags {
    TilingFlags { support_broadcast: true, special_pattern: true, absorbable_broadcast: true, ..Default::default() }
}

/// Same as [`static_flags`] with the 999 kernel available.
pub fn dynamic_flags() -> TilingFlags {
    TilingFlags { unknown_rank: true, ..static_flags() }
}

pub fn standard_profile(flags: TilingFlags) -> CompileTimeProfile {
    CompileTimeProfile::builder()
        .flags(flags)
        .base_info(base_info(ALL_PATTERN_KEYS, STANDARD_CAPACITY))
        .build()
        .expect("standard profile is valid")
}

/// Inputs of one dtype and a single output with an unset shape.
pub fn shapes(inputs: &[&[i64]], dtype: DType) -> RuntimeShapes {
    RuntimeShapes::new(
        inputs.iter().map(|shape| TensorDesc::new(shape.iter().copied(), dtype)).collect(),
        vec![OutputDesc::new(dtype)],
    )
}
