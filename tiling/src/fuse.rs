//! Dimension fusion.
//!
//! Adjacent axes that behave the same way under broadcasting are merged into one canonical
//! axis. Every axis is classified as all-one, common (every input has the same extent) or
//! broadcast, where a broadcast axis also remembers *which* inputs hold the 1:
//!
//! ```text
//! in0: [2, 3, 1, 1, 4]        states: C  C  B{0}  B{0}  C
//! in1: [2, 3, 5, 6, 4]
//! fused in0: [6, 1, 4]        groups: [0, 1] [2, 3] [4]
//! fused in1: [6, 30, 4]
//! ```
//!
//! All-one axes never start a group; they are absorbed into the group around them so that
//! `B{0} 1 B{0}` still fuses into a single broadcast axis.

use smallvec::{SmallVec, smallvec};
use snafu::ensure;
use tracing::debug;

use crate::error::*;
use crate::profile::CompileTimeProfile;
use crate::shape::{CompletedShapes, Dims, MAX_DIM_LEN, right_align};

/// Original axes absorbed by one canonical axis.
pub type AxisGroup = SmallVec<[usize; 4]>;

/// Shape after fusion, the form every later stage works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalShape {
    pub inputs: Vec<Dims>,
    pub output: Dims,
    /// `true` where inputs disagree (min extent 1, max extent above 1).
    pub broadcast_axis: SmallVec<[bool; MAX_DIM_LEN]>,
    /// Canonical axis -> original axes.
    pub groups: SmallVec<[AxisGroup; MAX_DIM_LEN]>,
}

impl CanonicalShape {
    pub fn rank(&self) -> usize {
        self.output.len()
    }

    pub fn output_size(&self) -> i64 {
        self.output.iter().product()
    }

    /// Right-align into `rank` axes. Padding axes are size 1, not broadcast, and absorb no
    /// original axis.
    pub fn pad_to(&self, rank: usize) -> Self {
        let pad = rank.saturating_sub(self.rank());
        let mut broadcast_axis: SmallVec<[bool; MAX_DIM_LEN]> = smallvec![false; pad];
        broadcast_axis.extend_from_slice(&self.broadcast_axis);
        let mut groups: SmallVec<[AxisGroup; MAX_DIM_LEN]> = smallvec![AxisGroup::new(); pad];
        groups.extend(self.groups.iter().cloned());

        Self {
            inputs: self.inputs.iter().map(|dims| right_align(dims, rank)).collect(),
            output: right_align(&self.output, rank),
            broadcast_axis,
            groups,
        }
    }

    /// Build from an explicit grouping of the completed axes.
    fn from_groups(completed: &CompletedShapes, groups: SmallVec<[AxisGroup; MAX_DIM_LEN]>) -> Self {
        let fuse = |dims: &Dims| -> Dims { groups.iter().map(|group| group.iter().map(|&a| dims[a]).product()).collect() };

        let inputs: Vec<Dims> = completed.inputs.iter().map(fuse).collect();
        let output = fuse(&completed.output);
        let broadcast_axis = (0..groups.len())
            .map(|axis| {
                let min = inputs.iter().map(|dims| dims[axis]).min().unwrap_or(1);
                let max = inputs.iter().map(|dims| dims[axis]).max().unwrap_or(1);
                min == 1 && max > 1
            })
            .collect();

        Self { inputs, output, broadcast_axis, groups }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AxisState {
    Ones,
    Common,
    /// Which inputs hold 1 on this axis.
    Broadcast(SmallVec<[bool; 4]>),
}

fn axis_state(inputs: &[Dims], axis: usize) -> AxisState {
    let first = inputs[0][axis];
    if inputs.iter().all(|dims| dims[axis] == first) {
        return if first == 1 { AxisState::Ones } else { AxisState::Common };
    }
    AxisState::Broadcast(inputs.iter().map(|dims| dims[axis] == 1).collect())
}

/// Fuse the completed shapes, honoring precomputed groups and broadcast bitmap from the profile.
pub fn fuse_dims(completed: &CompletedShapes, profile: &CompileTimeProfile) -> Result<CanonicalShape> {
    let mut shape = match profile.fusion_index() {
        Some(groups) => fuse_with_groups(completed, groups)?,
        None => fuse_adjacent(completed),
    };

    if let Some(bitmap) = profile.broadcast_axis() {
        ensure!(
            bitmap.len() == shape.rank(),
            MalformedFieldSnafu {
                field: "broadcast_axis",
                reason: format!("{} entries for {} fused axes", bitmap.len(), shape.rank()),
            }
        );
        shape.broadcast_axis = bitmap.iter().copied().collect();
    }

    debug!(fused.output = ?shape.output, fused.broadcast = ?shape.broadcast_axis, "dimensions fused");
    Ok(shape)
}

/// Merge adjacent axes with the same broadcasting behavior.
pub fn fuse_adjacent(completed: &CompletedShapes) -> CanonicalShape {
    let rank = completed.rank();
    let states: Vec<AxisState> = (0..rank).map(|axis| axis_state(&completed.inputs, axis)).collect();

    // Pure elementwise: nothing ever broadcasts, so the whole iteration space is one axis.
    if !states.iter().any(|state| matches!(state, AxisState::Broadcast(_))) {
        return CanonicalShape::from_groups(completed, smallvec![(0..rank).collect::<AxisGroup>()]);
    }

    let mut groups: SmallVec<[AxisGroup; MAX_DIM_LEN]> = SmallVec::new();
    let mut group_states: SmallVec<[AxisState; MAX_DIM_LEN]> = SmallVec::new();
    let mut leading_ones = AxisGroup::new();

    for (axis, state) in states.into_iter().enumerate() {
        if state == AxisState::Ones {
            match groups.last_mut() {
                Some(group) => group.push(axis),
                None => leading_ones.push(axis),
            }
            continue;
        }

        if group_states.last() == Some(&state)
            && let Some(group) = groups.last_mut()
        {
            group.push(axis);
        } else {
            let mut group = std::mem::take(&mut leading_ones);
            group.push(axis);
            groups.push(group);
            group_states.push(state);
        }
    }

    CanonicalShape::from_groups(completed, groups)
}

/// Fuse with groups computed at compile time. They must cover every axis exactly once, in order.
pub fn fuse_with_groups(completed: &CompletedShapes, groups: &[Vec<usize>]) -> Result<CanonicalShape> {
    let flattened: Vec<usize> = groups.iter().flatten().copied().collect();
    ensure!(
        groups.iter().all(|group| !group.is_empty()) && flattened.iter().copied().eq(0..completed.rank()),
        MalformedFieldSnafu {
            field: "fusion_index",
            reason: format!("groups {groups:?} do not cover axes 0..{}", completed.rank()),
        }
    );
    Ok(CanonicalShape::from_groups(completed, groups.iter().map(|group| group.iter().copied().collect()).collect()))
}
