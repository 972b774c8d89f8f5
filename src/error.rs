//! Error type shared by every stage of the vesselness pipeline.
//!
//! - `InvalidParameter` is raised synchronously before any task is scheduled.
//! - `ComputationFailure` / `ResourceExhaustion` / `Cancelled` originate inside
//!   a scale task; the scheduler tags them with the failing scale index.
use std::fmt;
use thiserror::Error;

/// Optional scale index attached to task-level failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScaleContext(pub Option<usize>);

impl fmt::Display for ScaleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, " at scale {index}"),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum VesselnessError {
    /// Rejected input or configuration; no work was started.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A smoothing or evaluation step could not complete.
    #[error("computation failed{scale}: {reason}")]
    ComputationFailure { scale: ScaleContext, reason: String },

    /// A per-scale result buffer could not be allocated.
    #[error("out of memory{scale}: could not allocate {bytes} bytes")]
    ResourceExhaustion { scale: ScaleContext, bytes: usize },

    /// The run was cancelled cooperatively.
    #[error("cancelled{scale}")]
    Cancelled { scale: ScaleContext },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VesselnessError>;

impl VesselnessError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameter(reason.into())
    }

    pub fn computation(reason: impl Into<String>) -> Self {
        Self::ComputationFailure {
            scale: ScaleContext::default(),
            reason: reason.into(),
        }
    }

    pub fn exhausted(bytes: usize) -> Self {
        Self::ResourceExhaustion {
            scale: ScaleContext::default(),
            bytes,
        }
    }

    pub fn cancelled() -> Self {
        Self::Cancelled {
            scale: ScaleContext::default(),
        }
    }

    /// Attach a scale index unless one is already recorded.
    pub fn at_scale(mut self, index: usize) -> Self {
        match &mut self {
            Self::InvalidParameter(_) => {}
            Self::ComputationFailure { scale, .. }
            | Self::ResourceExhaustion { scale, .. }
            | Self::Cancelled { scale } => {
                if scale.0.is_none() {
                    scale.0 = Some(index);
                }
            }
        }
        self
    }

    /// Scale index of the task that raised the error, if known.
    pub fn scale_index(&self) -> Option<usize> {
        match self {
            Self::InvalidParameter(_) => None,
            Self::ComputationFailure { scale, .. }
            | Self::ResourceExhaustion { scale, .. }
            | Self::Cancelled { scale } => scale.0,
        }
    }
}
