#![doc = include_str!("../README.md")]

// Public pipeline surface
pub mod error;
pub mod filter;
pub mod fusion;
pub mod grid;
pub mod progress;

// Stage-level building blocks, usable on their own.
pub mod cancel;
pub mod diagnostics;
pub mod hessian;
pub mod scheduler;
pub mod smoothing;

// Demo tooling.
pub mod config;

// --- High-level re-exports -------------------------------------------------

pub use crate::cancel::CancelToken;
pub use crate::error::{Result, VesselnessError};
pub use crate::filter::{
    OutputSelection, PerScaleOutput, VesselnessFilter, VesselnessOutput, VesselnessParams,
};
pub use crate::fusion::FusionResult;
pub use crate::grid::Grid;
pub use crate::hessian::{Polarity, ScoreParams, VesselnessResult};
pub use crate::scheduler::SpacingMode;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use vessel_detector::prelude::*;
///
/// # fn main() -> Result<(), VesselnessError> {
/// let (nx, ny, nz) = (64usize, 64usize, 32usize);
/// let volume = Grid::filled(&[nx, ny, nz], &[1.0, 1.0, 2.0], 0.0f32)?;
///
/// let filter = VesselnessFilter::new(VesselnessParams {
///     scale_count: 4,
///     min_scale: 1.0,
///     max_scale: 4.0,
///     ..Default::default()
/// })?;
///
/// let output = filter.process_with_progress(&volume, |f| println!("{:.0}%", f * 100.0))?;
/// println!("fused range {:?}", output.fusion.display_range());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        CancelToken, Grid, Polarity, VesselnessError, VesselnessFilter, VesselnessOutput,
        VesselnessParams,
    };
}
