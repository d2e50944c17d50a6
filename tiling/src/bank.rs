//! Tuned-solution bank.
//!
//! A bank is a list of entries built offline. Each entry names a shape signature (with `-1`
//! wildcards) and attribute values, then an ordered list of rules: conjunctions of range
//! predicates over products of output extents, each carrying a full tiling solution.
//!
//! Matching runs in three steps:
//!
//! ```text
//! no bank ──────────────────────────────────────► NoBank
//! signature matches? ── no, for every entry ────► Miss
//!          │ yes
//! first rule whose predicates all hold ─────────► Hit(solution)
//! ```

use snafu::{OptionExt, ensure};
use tracing::{debug, trace};

use crate::error::*;
use crate::fuse::CanonicalShape;

/// Wildcard extent in a bank signature.
pub const ANY_DIM: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Comparison {
    Le(i64),
    Ge(i64),
    Eq(i64),
    Ne(i64),
    /// Inclusive on both ends.
    Range { low: i64, high: i64 },
}

impl Comparison {
    pub fn holds(&self, value: i64) -> bool {
        match *self {
            Self::Le(bound) => value <= bound,
            Self::Ge(bound) => value >= bound,
            Self::Eq(bound) => value == bound,
            Self::Ne(bound) => value != bound,
            Self::Range { low, high } => (low..=high).contains(&value),
        }
    }
}

/// Predicate over the product of some output extents, optionally reduced modulo a power of two.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeCondition {
    pub axes: Vec<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modulo: Option<i64>,
    pub cmp: Comparison,
}

impl RangeCondition {
    pub fn value(&self, output: &[i64]) -> Result<i64> {
        let mut value = 1i64;
        for &axis in &self.axes {
            let dim = output.get(axis).copied().context(IndexOutOfRangeSnafu {
                what: "bank condition axis",
                index: axis,
                len: output.len(),
            })?;
            value = value.checked_mul(dim).context(ValueOverflowSnafu { value })?;
        }
        Ok(match self.modulo {
            Some(modulo) => value & (modulo - 1),
            None => value,
        })
    }

    pub fn holds(&self, output: &[i64]) -> Result<bool> {
        Ok(self.cmp.holds(self.value(output)?))
    }
}

/// Complete tiling decision stored in the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankSolution {
    pub block_axis: usize,
    pub block_factor: i64,
    pub ub_axis: usize,
    pub ub_factor: i64,
    pub block_dims: i64,
    pub tiling_key: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub double_buffer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankRule {
    pub conditions: Vec<RangeCondition>,
    pub solution: BankSolution,
}

impl BankRule {
    fn holds(&self, output: &[i64]) -> Result<bool> {
        for condition in &self.conditions {
            if !condition.holds(output)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankEntry {
    /// One signature per input, [`ANY_DIM`] matching any extent.
    pub shapes: Vec<Vec<i64>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attrs: Vec<i64>,
    pub rules: Vec<BankRule>,
}

impl BankEntry {
    fn matches_signature(&self, shape: &CanonicalShape, attrs: &[i64]) -> bool {
        let dims_match = |pattern: &[i64], dims: &[i64]| {
            pattern.len() == dims.len() && pattern.iter().zip(dims).all(|(&p, &d)| p == ANY_DIM || p == d)
        };
        self.shapes.len() == shape.inputs.len()
            && self.shapes.iter().zip(&shape.inputs).all(|(pattern, dims)| dims_match(pattern.as_slice(), dims.as_slice()))
            && self.attrs.as_slice() == attrs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct BankTable {
    pub entries: Vec<BankEntry>,
}

impl BankTable {
    pub fn new(entries: Vec<BankEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject solutions and predicates that cannot be applied at runtime.
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| MalformedFieldSnafu { field: "bank_info", reason };
        for (index, entry) in self.entries.iter().enumerate() {
            for rule in &entry.rules {
                for condition in &rule.conditions {
                    if let Some(modulo) = condition.modulo {
                        ensure!(
                            modulo > 0 && modulo & (modulo - 1) == 0,
                            malformed(format!("entry {index}: modulo {modulo} is not a power of two"))
                        );
                    }
                }
                let solution = &rule.solution;
                ensure!(
                    solution.block_factor > 0 && solution.ub_factor > 0 && solution.block_dims > 0,
                    malformed(format!("entry {index}: solution factors must be positive"))
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankMatch<'a> {
    NoBank,
    Miss,
    Hit(&'a BankSolution),
}

/// Find the first rule that applies to `shape`; its solution axes are checked against the rank.
pub fn match_bank<'a>(table: Option<&'a BankTable>, shape: &CanonicalShape, attrs: &[i64]) -> Result<BankMatch<'a>> {
    let Some(table) = table.filter(|table| !table.is_empty()) else {
        trace!("no bank");
        return Ok(BankMatch::NoBank);
    };

    for (index, entry) in table.entries.iter().enumerate() {
        if !entry.matches_signature(shape, attrs) {
            continue;
        }
        trace!(entry = index, "bank signature matched");

        for rule in &entry.rules {
            if !rule.holds(&shape.output)? {
                continue;
            }
            let solution = &rule.solution;
            for axis in [solution.block_axis, solution.ub_axis] {
                ensure!(
                    axis < shape.rank(),
                    IndexOutOfRangeSnafu { what: "bank solution axis", index: axis, len: shape.rank() }
                );
            }
            debug!(entry = index, key = solution.tiling_key, "bank hit");
            return Ok(BankMatch::Hit(solution));
        }
    }

    debug!("bank miss");
    Ok(BankMatch::Miss)
}
