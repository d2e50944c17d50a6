//! Broadcast pattern classification.
//!
//! A fused shape of at most [`MAX_PATTERN_DIM`] axes is summarized as a digit string, one digit
//! per axis (`1` common, `2` broadcast), right-padded with zeros to three digits:
//!
//! ```text
//! [C]       -> 100  Common
//! [C, B]    -> 120  CommonBroadcast
//! [C, B, C] -> 121  CommonBroadcastCommon
//! [B]       -> 200  Broadcast (may be refined to 230 / 320)
//! [B, C]    -> 210  BroadcastCommon
//! ```
//!
//! Anything else runs on the generic kernels: 999 when the operator was compiled with
//! unknown-rank support, 000 otherwise.

use tracing::debug;

use crate::fuse::CanonicalShape;
use crate::profile::CompileTimeProfile;
use crate::shape::MAX_DIM_LEN;

/// Widest fused shape that can match a special pattern.
pub const MAX_PATTERN_DIM: usize = 3;

const COMMON_DIGIT: u32 = 1;
const BROADCAST_DIGIT: u32 = 2;

/// Precompiled kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Pattern {
    /// Generic kernel over the fused shape.
    Original = 0,
    Common = 100,
    CommonBroadcast = 120,
    CommonBroadcastCommon = 121,
    Broadcast = 200,
    BroadcastCommon = 210,
    /// Single broadcast axis where input 1 is the scalar.
    BroadcastScalar = 230,
    /// Single broadcast axis where input 0 is the scalar.
    ScalarBroadcast = 320,
    /// Fully dynamic kernel over [`MAX_DIM_LEN`] axes.
    UnknownUnknown = 999,
}

impl Pattern {
    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Three-digit key used by the capacity table.
    pub fn key(self) -> String {
        format!("{:03}", self.id())
    }

    fn from_signature(signature: u32) -> Option<Self> {
        match signature {
            100 => Some(Self::Common),
            120 => Some(Self::CommonBroadcast),
            121 => Some(Self::CommonBroadcastCommon),
            200 => Some(Self::Broadcast),
            210 => Some(Self::BroadcastCommon),
            _ => None,
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.id())
    }
}

/// Same/broadcast signature of a fused shape, or `None` above [`MAX_PATTERN_DIM`] axes.
pub fn signature(shape: &CanonicalShape) -> Option<u32> {
    let rank = shape.rank();
    if rank == 0 || rank > MAX_PATTERN_DIM {
        return None;
    }
    let digits = shape
        .broadcast_axis
        .iter()
        .fold(0, |sig, &broadcast| sig * 10 + if broadcast { BROADCAST_DIGIT } else { COMMON_DIGIT });
    Some(digits * 10u32.pow((MAX_PATTERN_DIM - rank) as u32))
}

/// Chosen pattern and the shape its kernel sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub pattern: Pattern,
    pub shape: CanonicalShape,
}

/// Pick the kernel family for `shape`.
pub fn classify(shape: CanonicalShape, profile: &CompileTimeProfile) -> Classification {
    let flags = profile.flags();

    if flags.special_pattern
        && let Some(pattern) = signature(&shape).and_then(Pattern::from_signature)
    {
        let pattern = refine_absorbable(pattern, &shape, profile);
        if profile.has_capacity(pattern) {
            debug!(%pattern, "special pattern matched");
            return Classification { pattern, shape };
        }
        debug!(%pattern, "special pattern has no compiled kernel");
    }

    if flags.dynamic_fallback() {
        debug!(rank = MAX_DIM_LEN, "falling back to fully dynamic pattern");
        return Classification { pattern: Pattern::UnknownUnknown, shape: shape.pad_to(MAX_DIM_LEN) };
    }

    debug!("falling back to original pattern");
    Classification { pattern: Pattern::Original, shape }
}

/// Single-axis broadcast between two inputs has a cheaper kernel when one side is a scalar.
fn refine_absorbable(pattern: Pattern, shape: &CanonicalShape, profile: &CompileTimeProfile) -> Pattern {
    if pattern != Pattern::Broadcast || !profile.flags().absorbable_broadcast || shape.inputs.len() != 2 {
        return pattern;
    }

    let refined = match (shape.inputs[0][0], shape.inputs[1][0]) {
        (1, _) => Pattern::ScalarBroadcast,
        (_, 1) => Pattern::BroadcastScalar,
        _ => return pattern,
    };

    if profile.has_capacity(refined) { refined } else { pattern }
}
