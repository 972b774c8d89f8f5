use crate::error::{Result, VesselnessError};
use crate::fusion::MAX_INDEXED_SCALES;
use crate::hessian::ScoreParams;
use crate::scheduler::{validate_scales, SpacingMode};
use serde::{Deserialize, Serialize};

/// Optional side channels returned next to the fused scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSelection {
    /// Keep the smoothed grid of every scale.
    pub emit_smoothed_per_scale: bool,
    /// Keep the vesselness scores of every scale.
    pub emit_filtered_per_scale: bool,
    /// Record which scale won at each voxel (1-based, `0` = none).
    pub emit_scale_index_map: bool,
}

/// Parameters of a multi-scale vesselness run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselnessParams {
    /// Number of scales, at least 1.
    pub scale_count: usize,
    /// Smallest physical scale (same unit as the grid spacing), > 0.
    pub min_scale: f64,
    /// Largest physical scale, >= `min_scale`.
    pub max_scale: f64,
    pub score: ScoreParams,
    pub spacing_mode: SpacingMode,
    pub outputs: OutputSelection,
    /// Worker threads for the scale pool; 0 = available hardware threads.
    pub threads: usize,
}

impl Default for VesselnessParams {
    fn default() -> Self {
        Self {
            scale_count: 1,
            min_scale: 1.0,
            max_scale: 1.0,
            score: ScoreParams::default(),
            spacing_mode: SpacingMode::PerAxis,
            outputs: OutputSelection::default(),
            threads: 0,
        }
    }
}

impl VesselnessParams {
    /// Convenience for `count` scales evenly spread over `[min, max]`.
    pub fn with_scales(scale_count: usize, min_scale: f64, max_scale: f64) -> Self {
        Self {
            scale_count,
            min_scale,
            max_scale,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_scales(self.scale_count, self.min_scale, self.max_scale)?;
        self.score.validate()?;
        if self.outputs.emit_scale_index_map && self.scale_count > MAX_INDEXED_SCALES {
            return Err(VesselnessError::invalid(format!(
                "scale index map holds at most {MAX_INDEXED_SCALES} scales, got {}",
                self.scale_count
            )));
        }
        Ok(())
    }
}
