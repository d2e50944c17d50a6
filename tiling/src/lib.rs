//! Runtime tiling for broadcast and elementwise operators on multi-core vector devices.
//!
//! Given the runtime shapes of one operator call and the profile its kernels were compiled
//! with, the engine decides how many units to launch, how each unit walks its slice through
//! the on-chip buffer, which precompiled kernel variant runs (the tiling key) and which
//! integers that kernel reads (the tiling data).
//!
//! # Module Organization
//!
//! - [`shape`] - Runtime shape descriptors and right-aligned completion
//! - [`fuse`] - Fusion of adjacent axes with the same broadcasting behavior
//! - [`pattern`] - Classification into precompiled kernel families
//! - [`capacity`] - Per-pattern hardware capacity and thresholds
//! - [`block`] - Multi-core split
//! - [`ub`] - Per-unit buffer split and broadcast heuristics
//! - [`bank`] - Tuned-solution lookup
//! - [`emit`] - Tiling key encoding and tiling data emission
//! - [`profile`] - Compile-time profile and its serialized form
//! - [`config`] - Runtime options
//! - [`engine`] - The pipeline tying it all together
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use vectile_dtype::DType;
//! use vectile_tiling::{CompileTimeProfile, OutputDesc, RuntimeShapes, TensorDesc, TilingFlags, tile};
//!
//! let flags = TilingFlags { support_broadcast: true, special_pattern: true, ..Default::default() };
//! let base_info = HashMap::from([("100".to_string(), vec![32, 4, 21840, 10920])]);
//! let profile = CompileTimeProfile::builder().flags(flags).base_info(base_info).build()?;
//!
//! let shapes = RuntimeShapes::new(
//!     vec![TensorDesc::new([275614, 11], DType::Float32)],
//!     vec![OutputDesc::new(DType::Float32)],
//! );
//! let decision = tile(&profile, &shapes)?;
//! assert_eq!(decision.block_dims, 32);
//! assert_eq!(decision.tiling_key, Some(10_010_001));
//! # Ok::<(), vectile_tiling::Error>(())
//! ```

mod arith;
pub mod bank;
pub mod block;
pub mod capacity;
pub mod config;
pub mod decision;
pub mod emit;
pub mod engine;
pub mod error;
pub mod fuse;
pub mod pattern;
pub mod profile;
pub mod shape;
pub mod ub;

#[cfg(test)]
pub mod test;

pub use bank::{BankEntry, BankMatch, BankRule, BankSolution, BankTable, Comparison, RangeCondition};
pub use config::TilingOptions;
pub use decision::TilingDecision;
pub use emit::{CONST_KEY_BASE, EMPTY_TENSOR_KEY, EmissionToken, encode_key};
pub use engine::{BroadcastTiling, tile};
pub use error::{Error, Result};
pub use fuse::CanonicalShape;
pub use pattern::Pattern;
pub use profile::{CompileInfo, CompileTimeProfile, DeviceFamily, TilingFlags};
pub use shape::{MAX_DIM_LEN, OutputDesc, RuntimeShapes, TensorDesc};

pub use vectile_dtype::DType;
