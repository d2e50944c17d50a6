//! Tiling pipeline.
//!
//! ```text
//! RuntimeShapes
//!   -> complete_shapes -> fuse_dims -> classify
//!   -> empty output? ────────────────────────► empty-tensor key, one unit
//!   -> const shape? ─────────────────────────► const key, const unit count
//!   -> bank hit? ────────────────────────────► tuned solution ───────┐
//!   -> capacity -> block tiling -> buffer tiling -> encode_key ──────┴─► emit
//! ```

use smallvec::SmallVec;
use snafu::OptionExt;
use tracing::debug;

use crate::bank::{BankMatch, match_bank};
use crate::block::{BlockTiling, block_tiling, enforce_output_alignment};
use crate::capacity::resolve_capacity;
use crate::config::TilingOptions;
use crate::decision::TilingDecision;
use crate::emit::{CONST_KEY_BASE, EMPTY_TENSOR_KEY, axis_factor_data, emit_tiling_data, encode_key};
use crate::error::*;
use crate::fuse::{CanonicalShape, fuse_dims};
use crate::pattern::{Classification, classify};
use crate::profile::CompileTimeProfile;
use crate::shape::{CompletedShapes, RuntimeShapes, complete_shapes};
use crate::ub::{UbRequest, ub_tiling};

/// Tiling engine for one compiled operator.
///
/// Holds no per-call state; one instance may serve any number of calls.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastTiling<'a> {
    profile: &'a CompileTimeProfile,
    options: TilingOptions,
}

impl<'a> BroadcastTiling<'a> {
    pub fn new(profile: &'a CompileTimeProfile) -> Self {
        Self { profile, options: TilingOptions::default() }
    }

    pub fn with_options(mut self, options: TilingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TilingOptions {
        &self.options
    }

    #[tracing::instrument(skip_all, fields(inputs = shapes.inputs.len(), outputs = shapes.outputs.len()))]
    pub fn run(&self, shapes: &RuntimeShapes) -> Result<TilingDecision> {
        let profile = self.profile;
        let flags = profile.flags();

        let completed = complete_shapes(shapes, flags.support_broadcast)?;
        let size = completed.checked_output_size()?;
        debug!(output = ?completed.output, size, in_dtype = %completed.in_dtype, out_dtype = %completed.out_dtype, "shapes completed");

        let canonical = fuse_dims(&completed, profile)?;
        let Classification { pattern, shape } = classify(canonical, profile);
        let mut decision = TilingDecision::new(pattern, completed.output.clone());

        if completed.is_empty() {
            debug!("empty output, nothing to tile");
            decision.tiling_key = Some(EMPTY_TENSOR_KEY);
            return Ok(decision);
        }

        if flags.const_shapes {
            return self.const_decision(decision, &completed);
        }

        if self.options.use_bank
            && let BankMatch::Hit(solution) = match_bank(profile.banks(), &shape, &shapes.attrs)?
        {
            decision.apply_bank(solution);
            return self.finish(decision, &shape, &shapes.attrs);
        }

        let capacity = resolve_capacity(profile, pattern)?;
        capacity.check_dtype(completed.in_dtype)?;
        let elems_per_block = profile.elems_per_block(completed.out_dtype);
        debug!(?capacity, elems_per_block, "capacity resolved");

        if size < capacity.multi_unit_threshold(elems_per_block) {
            debug!(size, "below multi-unit threshold, single unit");
            return self.finish(decision, &shape, &shapes.attrs);
        }

        let align_units = self.options.block_align
            && profile.device().is_newer()
            && size >= capacity.block_align_threshold(elems_per_block);
        let block = block_tiling(&shape.output, capacity.units, elems_per_block, align_units)?;
        let block = self.check_output_alignment(block, &shape, &completed);
        decision.apply_block(&block);

        let (start_axis, start_extent) = match block.axis {
            Some(axis) => (axis, block.factor),
            None => (0, shape.output[0]),
        };
        let ub = ub_tiling(&UbRequest {
            output: &shape.output,
            broadcast_axis: &shape.broadcast_axis,
            start_axis,
            start_extent,
            capacity,
            elems_per_block,
            broadcast_opt: self.options.broadcast_ub_opt,
        })?;
        decision.apply_ub(&ub);

        self.finish(decision, &shape, &shapes.attrs)
    }

    fn check_output_alignment(&self, block: BlockTiling, shape: &CanonicalShape, completed: &CompletedShapes) -> BlockTiling {
        let out_elems: SmallVec<[i64; 2]> =
            completed.out_dtypes.iter().map(|&dtype| self.profile.elems_per_block(dtype)).collect();
        enforce_output_alignment(block, &shape.output, &out_elems)
    }

    fn const_decision(&self, mut decision: TilingDecision, completed: &CompletedShapes) -> Result<TilingDecision> {
        let index = self
            .profile
            .const_shapes()
            .iter()
            .position(|shape| shape.as_slice() == completed.output.as_slice())
            .context(ConstShapeNotFoundSnafu { shape: completed.output.to_vec() })?;
        let units = self.profile.const_block_dims().get(index).copied().context(IndexOutOfRangeSnafu {
            what: "const unit count",
            index,
            len: self.profile.const_block_dims().len(),
        })?;

        decision.block_dims = units;
        decision.tiling_key = Some(CONST_KEY_BASE + index as u64);
        debug!(index, units, "const shape matched");
        Ok(decision)
    }

    /// Encode the key (unless the bank already chose one) and emit tiling data.
    fn finish(&self, mut decision: TilingDecision, shape: &CanonicalShape, attrs: &[i64]) -> Result<TilingDecision> {
        if self.profile.flags().axis_factor_only {
            decision.tiling_key = None;
            decision.tiling_data = axis_factor_data(&decision)?;
            return Ok(decision);
        }

        let key = match decision.tiling_key {
            Some(key) => key,
            None => encode_key(decision.pattern, decision.double_buffer, decision.block_axis, decision.ub_axis, shape.rank()),
        };
        decision.tiling_key = Some(key);

        if let Some(emission) = self.profile.emission() {
            let tokens = emission.get(&key).context(MissingEmissionListSnafu { key })?;
            decision.tiling_data = emit_tiling_data(tokens, &decision, shape, attrs)?;
        }

        debug!(
            key,
            units = decision.block_dims,
            block_axis = ?decision.block_axis,
            block_factor = decision.block_factor,
            ub_axis = ?decision.ub_axis,
            ub_factor = decision.ub_factor,
            double_buffer = decision.double_buffer,
            "tiling decided"
        );
        Ok(decision)
    }
}

/// Tile one call with default options.
pub fn tile(profile: &CompileTimeProfile, shapes: &RuntimeShapes) -> Result<TilingDecision> {
    BroadcastTiling::new(profile).run(shapes)
}
