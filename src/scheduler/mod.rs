//! Multi-scale scheduling: one task per scale, run on a bounded worker pool.
//!
//! Overview
//! - Scales are evenly spaced between `min_scale` and `max_scale`.
//! - Parameters are validated before anything is submitted; a rejected run
//!   never touches the executor.
//! - The executor drains every task. If any failed, the failure with the
//!   lowest scale index is returned and partial results are dropped.
//! - Successful results come back ordered by scale index regardless of the
//!   order in which workers finished.
mod executor;
mod task;

pub use executor::{RayonExecutor, ScaleExecutor, SequentialExecutor};
pub use task::{ScaleOutput, ScaleTask, SpacingMode};

use crate::cancel::CancelToken;
use crate::error::{Result, VesselnessError};
use crate::grid::{Grid, SUPPORTED_DIMS};
use crate::hessian::ScoreParams;
use crate::progress::ProgressSink;
use log::{debug, warn};

/// Evenly spaced physical scales, `min_scale` first.
pub fn scale_values(count: usize, min_scale: f64, max_scale: f64) -> Vec<f64> {
    if count <= 1 {
        return vec![min_scale; count];
    }
    let step = (max_scale - min_scale) / (count - 1) as f64;
    (0..count).map(|i| min_scale + i as f64 * step).collect()
}

/// Check scale-range arguments without allocating anything.
pub fn validate_scales(count: usize, min_scale: f64, max_scale: f64) -> Result<()> {
    if count == 0 {
        return Err(VesselnessError::invalid("scale_count must be >= 1"));
    }
    if !min_scale.is_finite() || !max_scale.is_finite() {
        return Err(VesselnessError::invalid(format!(
            "scales must be finite, got min {min_scale} and max {max_scale}"
        )));
    }
    if min_scale <= 0.0 {
        return Err(VesselnessError::invalid(format!(
            "min_scale must be > 0, got {min_scale}"
        )));
    }
    if max_scale < min_scale {
        return Err(VesselnessError::invalid(format!(
            "max_scale {max_scale} is smaller than min_scale {min_scale}"
        )));
    }
    Ok(())
}

/// Builds scale tasks, hands them to an executor and joins the results.
#[derive(Debug)]
pub struct ScaleScheduler<E = RayonExecutor> {
    executor: E,
    params: ScoreParams,
    spacing_mode: SpacingMode,
    keep_smoothed: bool,
    cancel: CancelToken,
}

impl<E: ScaleExecutor> ScaleScheduler<E> {
    pub fn new(executor: E, params: ScoreParams) -> Self {
        Self {
            executor,
            params,
            spacing_mode: SpacingMode::default(),
            keep_smoothed: false,
            cancel: CancelToken::default(),
        }
    }

    pub fn with_spacing_mode(mut self, mode: SpacingMode) -> Self {
        self.spacing_mode = mode;
        self
    }

    /// Return each scale's smoothed grid alongside its scores.
    pub fn keep_smoothed(mut self, keep: bool) -> Self {
        self.keep_smoothed = keep;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every scale and return the outputs ordered by scale index.
    pub fn run(
        &self,
        grid: &Grid<f32>,
        scale_count: usize,
        min_scale: f64,
        max_scale: f64,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<ScaleOutput>> {
        validate_scales(scale_count, min_scale, max_scale)?;
        self.params.validate()?;
        if !SUPPORTED_DIMS.contains(&grid.dims()) {
            return Err(VesselnessError::invalid(format!(
                "grid must be 2-D or 3-D, got {}-D",
                grid.dims()
            )));
        }

        let tasks: Vec<_> = scale_values(scale_count, min_scale, max_scale)
            .into_iter()
            .enumerate()
            .map(|(i, scale)| {
                ScaleTask::new(i, scale, grid, self.params, self.spacing_mode)
                    .keep_smoothed(self.keep_smoothed)
            })
            .collect();
        debug!(
            "ScaleScheduler::run submitting {} scales in [{min_scale}, {max_scale}] for grid {:?}",
            tasks.len(),
            grid.size()
        );

        let results = self.executor.execute(tasks, progress, &self.cancel);
        if results.len() != scale_count {
            return Err(VesselnessError::computation(format!(
                "executor returned {} results for {scale_count} tasks",
                results.len()
            )));
        }
        collect_in_order(results)
    }
}

/// Keep results in scale order, or surface the lowest-index failure.
fn collect_in_order(results: Vec<Result<ScaleOutput>>) -> Result<Vec<ScaleOutput>> {
    let mut outputs = Vec::with_capacity(results.len());
    let mut first_error: Option<VesselnessError> = None;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(out) if out.scale_index == index => outputs.push(out),
            Ok(out) => {
                let err = VesselnessError::computation(format!(
                    "result for scale {} returned in slot {index}",
                    out.scale_index
                ))
                .at_scale(index);
                first_error.get_or_insert(err);
            }
            Err(err) => {
                let err = err.at_scale(index);
                warn!("scale task failed: {err}");
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(outputs),
    }
}
