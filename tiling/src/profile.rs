//! Compile-time profile.
//!
//! Everything the operator compiler decided ahead of time: which kernel families exist, their
//! hardware capacities, what tiling data each kernel reads, and optional precomputed fusion
//! and tuned solutions. A profile is built once per compiled operator and reused across every
//! runtime call. All validation happens at construction.

use std::collections::HashMap;

use bon::bon;
use snafu::{OptionExt, ensure};
use strum::EnumCount;
use vectile_dtype::DType;

use crate::bank::BankTable;
use crate::emit::EmissionToken;
use crate::error::*;
use crate::pattern::Pattern;

/// Default alignment unit in bytes.
pub const DEFAULT_UB_BLOCK_BYTES: i64 = 32;

/// Devices whose unit scheduler benefits from divisor-aligned unit counts.
const NEWER_FAMILIES: &[&str] = &["Ascend910B", "Ascend910_93", "Ascend310B"];

/// Boolean compile flags, in the order the compiler serializes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TilingFlags {
    /// Emit only `[block_axis, block_factor, ub_axis, ub_factor]`, no tiling key.
    pub axis_factor_only: bool,
    /// Shapes were fully known at compile time.
    pub const_shapes: bool,
    pub support_broadcast: bool,
    /// Specialized kernels for the patterns of [`Pattern`] were compiled.
    pub special_pattern: bool,
    /// Scalar-broadcast refinements (230 / 320) were compiled.
    pub absorbable_broadcast: bool,
    pub unknown_rank: bool,
    pub has_all_unknown: bool,
}

impl TilingFlags {
    /// Positions past the end of `flags` read as `false`.
    pub fn from_flag_info(flags: &[bool]) -> Result<Self> {
        ensure!(!flags.is_empty(), MalformedFieldSnafu { field: "flag_info", reason: "no flags" });
        let at = |index: usize| flags.get(index).copied().unwrap_or(false);
        Ok(Self {
            axis_factor_only: at(0),
            const_shapes: at(1),
            support_broadcast: at(2),
            special_pattern: at(3),
            absorbable_broadcast: at(4),
            unknown_rank: at(5),
            has_all_unknown: at(6),
        })
    }

    /// The fully dynamic 999 kernel exists.
    pub fn dynamic_fallback(&self) -> bool {
        self.unknown_rank || self.has_all_unknown
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceFamily {
    #[default]
    Legacy,
    Newer,
}

impl DeviceFamily {
    pub fn from_soc(soc_version: &str) -> Self {
        if NEWER_FAMILIES.iter().any(|family| soc_version.starts_with(family)) { Self::Newer } else { Self::Legacy }
    }

    pub fn is_newer(self) -> bool {
        self == Self::Newer
    }
}

/// Elements per alignment unit, per dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentTable {
    block_bytes: i64,
    elems: [i64; DType::COUNT],
}

impl AlignmentTable {
    pub fn new(block_bytes: i64) -> Result<Self> {
        ensure!(block_bytes > 0, ZeroDivisorSnafu { what: "alignment unit" });
        let mut elems = [0; DType::COUNT];
        for dtype in DType::all() {
            let count = dtype.elems_per_block(block_bytes as usize) as i64;
            ensure!(count > 0, AlignmentTooSmallSnafu { block_bytes, dtype });
            elems[dtype.index()] = count;
        }
        Ok(Self { block_bytes, elems })
    }

    pub fn block_bytes(&self) -> i64 {
        self.block_bytes
    }

    pub fn elems_per_block(&self, dtype: DType) -> i64 {
        self.elems[dtype.index()]
    }
}

/// Validated, immutable compile-time profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTimeProfile {
    flags: TilingFlags,
    base_info: HashMap<String, Vec<i64>>,
    alignment: AlignmentTable,
    device: DeviceFamily,
    emission: Option<HashMap<u64, Vec<EmissionToken>>>,
    const_shapes: Vec<Vec<i64>>,
    const_block_dims: Vec<i64>,
    fusion_index: Option<Vec<Vec<usize>>>,
    broadcast_axis: Option<Vec<bool>>,
    banks: Option<BankTable>,
}

#[bon]
impl CompileTimeProfile {
    #[builder]
    pub fn new(
        flags: TilingFlags,
        // Pattern key -> `[units, max dtype bytes, buffer elems, double-buffered buffer elems]`.
        #[builder(default)] base_info: HashMap<String, Vec<i64>>,
        #[builder(default = DEFAULT_UB_BLOCK_BYTES)] ub_block_bytes: i64,
        #[builder(into)] soc_version: Option<String>,
        // Tiling key -> values the kernel reads. Without it no tiling data is emitted.
        emission: Option<HashMap<u64, Vec<EmissionToken>>>,
        #[builder(default)] const_shapes: Vec<Vec<i64>>,
        #[builder(default)] const_block_dims: Vec<i64>,
        fusion_index: Option<Vec<Vec<usize>>>,
        broadcast_axis: Option<Vec<bool>>,
        banks: Option<BankTable>,
    ) -> Result<Self> {
        let alignment = AlignmentTable::new(ub_block_bytes)?;
        let device = soc_version.as_deref().map(DeviceFamily::from_soc).unwrap_or_default();

        if flags.const_shapes {
            ensure!(
                const_shapes.len() == const_block_dims.len(),
                MalformedFieldSnafu {
                    field: "const_block_dims",
                    reason: format!("{} unit counts for {} const shapes", const_block_dims.len(), const_shapes.len()),
                }
            );
            ensure!(
                const_block_dims.iter().all(|&units| units > 0),
                MalformedFieldSnafu { field: "const_block_dims", reason: "unit counts must be positive" }
            );
        }
        if let Some(banks) = &banks {
            banks.validate()?;
        }

        Ok(Self {
            flags,
            base_info,
            alignment,
            device,
            emission,
            const_shapes,
            const_block_dims,
            fusion_index,
            broadcast_axis,
            banks,
        })
    }

    /// Build from the serialized compile info, validating every field.
    pub fn from_compile_info(info: &CompileInfo) -> Result<Self> {
        let flag_info = info.flag_info.as_deref().context(MissingFieldSnafu { field: "flag_info" })?;
        let flags = TilingFlags::from_flag_info(flag_info)?;

        let base_info = match &info.base_info {
            Some(base_info) => base_info.clone(),
            None if flags.const_shapes => HashMap::new(),
            None => return MissingFieldSnafu { field: "base_info" }.fail(),
        };

        let (const_shapes, const_block_dims) = if flags.const_shapes {
            (
                info.const_shapes.clone().context(MissingFieldSnafu { field: "const_shapes" })?,
                info.const_block_dims.clone().context(MissingFieldSnafu { field: "const_block_dims" })?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let emission = info.elewise_vars.as_ref().map(parse_emission).transpose()?;

        Self::builder()
            .flags(flags)
            .base_info(base_info)
            .ub_block_bytes(info.ub_block_bytes.unwrap_or(DEFAULT_UB_BLOCK_BYTES))
            .maybe_soc_version(info.soc_version.clone())
            .maybe_emission(emission)
            .const_shapes(const_shapes)
            .const_block_dims(const_block_dims)
            .maybe_fusion_index(info.fusion_index.clone())
            .maybe_broadcast_axis(info.broadcast_axis.clone())
            .maybe_banks(info.bank_info.clone())
            .build()
    }

    pub fn flags(&self) -> &TilingFlags {
        &self.flags
    }

    pub fn base_info(&self) -> &HashMap<String, Vec<i64>> {
        &self.base_info
    }

    /// A kernel was compiled for `pattern`.
    pub fn has_capacity(&self, pattern: Pattern) -> bool {
        self.base_info.contains_key(&pattern.key())
    }

    pub fn alignment(&self) -> &AlignmentTable {
        &self.alignment
    }

    pub fn elems_per_block(&self, dtype: DType) -> i64 {
        self.alignment.elems_per_block(dtype)
    }

    pub fn device(&self) -> DeviceFamily {
        self.device
    }

    pub fn emission(&self) -> Option<&HashMap<u64, Vec<EmissionToken>>> {
        self.emission.as_ref()
    }

    pub fn const_shapes(&self) -> &[Vec<i64>] {
        &self.const_shapes
    }

    pub fn const_block_dims(&self) -> &[i64] {
        &self.const_block_dims
    }

    pub fn fusion_index(&self) -> Option<&[Vec<usize>]> {
        self.fusion_index.as_deref()
    }

    pub fn broadcast_axis(&self) -> Option<&[bool]> {
        self.broadcast_axis.as_deref()
    }

    pub fn banks(&self) -> Option<&BankTable> {
        self.banks.as_ref()
    }
}

fn parse_emission(vars: &HashMap<String, Vec<i64>>) -> Result<HashMap<u64, Vec<EmissionToken>>> {
    vars.iter()
        .map(|(key, codes)| -> Result<(u64, Vec<EmissionToken>)> {
            let key = key.parse::<u64>().ok().context(MalformedFieldSnafu {
                field: "elewise_vars",
                reason: format!("tiling key {key:?} is not an unsigned integer"),
            })?;
            let tokens = codes.iter().map(|&code| EmissionToken::decode(code)).collect::<Result<Vec<_>>>()?;
            Ok((key, tokens))
        })
        .collect()
}

/// Serialized compile info, as produced by the operator compiler.
///
/// Every field is optional at the serialization layer; [`CompileTimeProfile::from_compile_info`]
/// decides which ones are required.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompileInfo {
    pub flag_info: Option<Vec<bool>>,
    pub base_info: Option<HashMap<String, Vec<i64>>>,
    pub ub_block_bytes: Option<i64>,
    pub soc_version: Option<String>,
    /// Tiling key (decimal string) -> emission codes.
    pub elewise_vars: Option<HashMap<String, Vec<i64>>>,
    pub const_shapes: Option<Vec<Vec<i64>>>,
    pub const_block_dims: Option<Vec<i64>>,
    pub fusion_index: Option<Vec<Vec<usize>>>,
    pub broadcast_axis: Option<Vec<bool>>,
    pub bank_info: Option<BankTable>,
}
