//! Runtime tiling options.
//!
//! Every optimization is on by default. Environment variables turn individual ones off, which
//! is useful when bisecting a performance regression against a tuned kernel.

use bon::bon;

/// Switches for the optional parts of the tiling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingOptions {
    /// Consult the tuned-solution bank before computing a tiling.
    pub use_bank: bool,
    /// Apply the broadcast-specific buffer factor heuristics.
    pub broadcast_ub_opt: bool,
    /// Prefer unit counts that divide the split axis on devices that support it.
    pub block_align: bool,
}

impl Default for TilingOptions {
    fn default() -> Self {
        Self { use_bank: true, broadcast_ub_opt: true, block_align: true }
    }
}

#[bon]
impl TilingOptions {
    /// Create tiling options with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default = true)] use_bank: bool,
        #[builder(default = true)] broadcast_ub_opt: bool,
        #[builder(default = true)] block_align: bool,
    ) -> Self {
        Self { use_bank, broadcast_ub_opt, block_align }
    }

    /// Create options from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `VECTILE_DISABLE_BANK` - Skip the tuned-solution bank
    /// * `VECTILE_NO_BROADCAST_OPT` - Disable broadcast buffer heuristics
    /// * `VECTILE_NO_BLOCK_ALIGN` - Disable divisor-aligned unit counts
    pub fn from_env() -> Self {
        Self {
            use_bank: std::env::var("VECTILE_DISABLE_BANK").is_err(),
            broadcast_ub_opt: std::env::var("VECTILE_NO_BROADCAST_OPT").is_err(),
            block_align: std::env::var("VECTILE_NO_BLOCK_ALIGN").is_err(),
        }
    }
}
