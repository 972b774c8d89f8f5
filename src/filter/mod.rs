//! Multi-scale vesselness filter: the public entry point of the crate.
//!
//! `VesselnessFilter::process` validates the parameters, runs one smoothing +
//! Hessian evaluation per scale on the worker pool, fuses the per-scale scores
//! and returns the fused grid together with the requested side channels.
//!
//! Stages and their timings
//! - `scales`: all per-scale tasks, joined (per-scale times in [`ScaleSummary`]).
//! - `fusion`: per-voxel maximum over scales.
mod params;

pub use params::{OutputSelection, VesselnessParams};

use crate::cancel::CancelToken;
use crate::diagnostics::{elapsed_ms, RunTiming, ScaleSummary};
use crate::error::Result;
use crate::fusion::{fuse, FusionResult};
use crate::grid::Grid;
use crate::hessian::VesselnessResult;
use crate::progress::ProgressAggregator;
use crate::scheduler::{RayonExecutor, ScaleExecutor, ScaleScheduler};
use log::debug;
use std::time::Instant;

/// Side-channel data of one scale, present only when requested.
#[derive(Clone, Debug)]
pub struct PerScaleOutput {
    pub scale_index: usize,
    pub scale: f64,
    pub smoothed: Option<Grid<f32>>,
    pub filtered: Option<VesselnessResult>,
}

#[derive(Clone, Debug)]
pub struct VesselnessOutput {
    pub fusion: FusionResult,
    /// Empty unless smoothed or filtered per-scale output was requested.
    pub per_scale: Vec<PerScaleOutput>,
    pub scales: Vec<ScaleSummary>,
    pub timing: RunTiming,
}

impl VesselnessOutput {
    pub fn fused(&self) -> &Grid<f32> {
        &self.fusion.scores
    }

    pub fn scale_index_map(&self) -> Option<&Grid<u8>> {
        self.fusion.scale_index.as_ref()
    }
}

/// Multi-scale vesselness filter bound to a worker pool.
#[derive(Debug)]
pub struct VesselnessFilter<E = RayonExecutor> {
    params: VesselnessParams,
    executor: E,
    cancel: CancelToken,
}

impl VesselnessFilter<RayonExecutor> {
    /// Filter with a rayon pool of `params.threads` workers.
    pub fn new(params: VesselnessParams) -> Result<Self> {
        params.validate()?;
        let executor = RayonExecutor::new(params.threads)?;
        Ok(Self::with_executor(params, executor))
    }
}

impl<E: ScaleExecutor> VesselnessFilter<E> {
    pub fn with_executor(params: VesselnessParams, executor: E) -> Self {
        Self {
            params,
            executor,
            cancel: CancelToken::default(),
        }
    }

    /// Share `cancel` with the caller; cancelling it aborts the next run.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn params(&self) -> &VesselnessParams {
        &self.params
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn process(&self, grid: &Grid<f32>) -> Result<VesselnessOutput> {
        let progress = ProgressAggregator::new(self.params.scale_count);
        self.run(grid, &progress)
    }

    /// Like [`process`](Self::process), pushing the overall fraction to
    /// `listener`. Values never decrease and end at `1.0` on success.
    pub fn process_with_progress(
        &self,
        grid: &Grid<f32>,
        listener: impl Fn(f64) + Send + Sync + 'static,
    ) -> Result<VesselnessOutput> {
        let progress = ProgressAggregator::new(self.params.scale_count).with_listener(listener);
        self.run(grid, &progress)
    }

    fn run(&self, grid: &Grid<f32>, progress: &ProgressAggregator) -> Result<VesselnessOutput> {
        let total_start = Instant::now();
        let params = &self.params;
        params.validate()?;
        let outputs_cfg = params.outputs;

        let mut timing = RunTiming::default();
        let scales_start = Instant::now();
        let outputs = ScaleScheduler::new(&self.executor, params.score)
            .with_spacing_mode(params.spacing_mode)
            .keep_smoothed(outputs_cfg.emit_smoothed_per_scale)
            .with_cancel_token(self.cancel.clone())
            .run(
                grid,
                params.scale_count,
                params.min_scale,
                params.max_scale,
                progress,
            )?;
        let scales_ms = timing.record("scales", scales_start);
        debug!(
            "VesselnessFilter::run {} scales on grid {:?} took {:.3} ms",
            outputs.len(),
            grid.size(),
            scales_ms
        );

        let mut scales = Vec::with_capacity(outputs.len());
        let mut smoothed = Vec::with_capacity(outputs.len());
        let mut results = Vec::with_capacity(outputs.len());
        for out in outputs {
            let has_scores = out.result.has_finite_scores();
            scales.push(ScaleSummary {
                scale_index: out.scale_index,
                scale: out.scale,
                derived_spacing: out.derived_spacing,
                min_score: has_scores.then_some(out.result.min_score),
                max_score: has_scores.then_some(out.result.max_score),
                smoothing_ms: out.smoothing_ms,
                evaluation_ms: out.evaluation_ms,
            });
            smoothed.push(out.smoothed);
            results.push(out.result);
        }

        let fusion_start = Instant::now();
        let fusion = fuse(&results, outputs_cfg.emit_scale_index_map)?;
        let fusion_ms = timing.record("fusion", fusion_start);
        debug!(
            "VesselnessFilter::run fusion took {:.3} ms, fused range [{}, {}]",
            fusion_ms, fusion.min_score, fusion.max_score
        );

        let per_scale = if outputs_cfg.emit_smoothed_per_scale || outputs_cfg.emit_filtered_per_scale {
            scales
                .iter()
                .zip(smoothed)
                .zip(results)
                .map(|((summary, smoothed), result)| PerScaleOutput {
                    scale_index: summary.scale_index,
                    scale: summary.scale,
                    smoothed,
                    filtered: outputs_cfg.emit_filtered_per_scale.then_some(result),
                })
                .collect()
        } else {
            Vec::new()
        };

        timing.total_ms = elapsed_ms(total_start);
        progress.finish();
        Ok(VesselnessOutput {
            fusion,
            per_scale,
            scales,
            timing,
        })
    }
}
