//! Per-voxel reduction of per-scale scores.
//!
//! The fused value is the largest finite score over all scales. The optional
//! index map stores `argmax + 1` (first scale wins ties) and `0` where no
//! scale produced a finite score; those voxels get a fused score of `0`.
use crate::error::{Result, VesselnessError};
use crate::grid::{try_alloc, Grid};
use crate::hessian::VesselnessResult;

/// Number of scales an `u8` index map can encode next to the `0` sentinel.
pub const MAX_INDEXED_SCALES: usize = u8::MAX as usize;

#[derive(Clone, Debug)]
pub struct FusionResult {
    pub scores: Grid<f32>,
    /// 1-based index of the winning scale per voxel; `0` means none.
    pub scale_index: Option<Grid<u8>>,
    pub min_score: f32,
    pub max_score: f32,
}

impl FusionResult {
    /// `(min, 0.5 * max)` of the fused scores.
    pub fn display_range(&self) -> (f32, f32) {
        (self.min_score, 0.5 * self.max_score)
    }
}

/// Fuse per-scale results ordered by scale index.
pub fn fuse(results: &[VesselnessResult], record_scale_index: bool) -> Result<FusionResult> {
    let first = results
        .first()
        .ok_or_else(|| VesselnessError::computation("no per-scale results to fuse"))?;
    if let Some(i) = results
        .iter()
        .position(|r| !r.scores.same_shape(&first.scores))
    {
        return Err(VesselnessError::computation(format!(
            "scale {i} has shape {:?}, expected {:?}",
            results[i].scores.size(),
            first.scores.size()
        ))
        .at_scale(i));
    }
    if record_scale_index && results.len() > MAX_INDEXED_SCALES {
        return Err(VesselnessError::invalid(format!(
            "scale index map holds at most {MAX_INDEXED_SCALES} scales, got {}",
            results.len()
        )));
    }

    let len = first.scores.len();
    let mut fused = try_alloc(len, f32::NEG_INFINITY)
        .map_err(|_| VesselnessError::exhausted(len * std::mem::size_of::<f32>()))?;
    let mut index = if record_scale_index {
        Some(try_alloc(len, 0u8).map_err(|_| VesselnessError::exhausted(len))?)
    } else {
        None
    };

    for (scale, result) in results.iter().enumerate() {
        for (v, &score) in result.scores.data().iter().enumerate() {
            // Strict comparison keeps the lowest scale on ties.
            if score.is_finite() && score > fused[v] {
                fused[v] = score;
                if let Some(map) = index.as_mut() {
                    map[v] = (scale + 1) as u8;
                }
            }
        }
    }

    let mut min_score = f32::INFINITY;
    let mut max_score = f32::NEG_INFINITY;
    for v in fused.iter_mut() {
        if *v == f32::NEG_INFINITY {
            *v = 0.0;
        }
        min_score = min_score.min(*v);
        max_score = max_score.max(*v);
    }
    let scores = first.scores.with_data(fused)?;
    let scale_index = index.map(|map| first.scores.with_data(map)).transpose()?;
    Ok(FusionResult {
        scores,
        scale_index,
        min_score,
        max_score,
    })
}
