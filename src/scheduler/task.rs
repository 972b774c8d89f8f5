use crate::cancel::CancelToken;
use crate::diagnostics::elapsed_ms;
use crate::error::Result;
use crate::grid::Grid;
use crate::hessian::{HessianEvaluator, ScoreParams, VesselnessResult};
use crate::progress::ProgressSink;
use crate::smoothing::smooth;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How a physical scale is turned into per-axis smoothing widths.
///
/// For axis `d` the scale is divided by a reference spacing to give the
/// index-space sigma; the finite-difference spacing becomes
/// `spacing[d] * sigma[d]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingMode {
    /// Reference spacing is the axis' own spacing.
    #[default]
    PerAxis,
    /// Reference spacing is `spacing[0]` for every axis.
    FirstAxis,
}

impl SpacingMode {
    /// Index-space sigma per axis for a physical `scale`.
    pub fn sigma(self, scale: f64, spacing: &[f64]) -> Vec<f64> {
        spacing
            .iter()
            .map(|&s| match self {
                SpacingMode::PerAxis => scale / s,
                SpacingMode::FirstAxis => scale / spacing[0],
            })
            .collect()
    }
}

/// One scale of the multi-scale filter: smooth, then evaluate.
#[derive(Clone, Debug)]
pub struct ScaleTask<'a> {
    pub scale_index: usize,
    pub scale: f64,
    pub sigma: Vec<f64>,
    pub derived_spacing: Vec<f64>,
    pub source: &'a Grid<f32>,
    pub params: ScoreParams,
    pub keep_smoothed: bool,
}

/// Everything a finished scale hands back to the scheduler.
#[derive(Clone, Debug)]
pub struct ScaleOutput {
    pub scale_index: usize,
    pub scale: f64,
    pub derived_spacing: Vec<f64>,
    pub smoothed: Option<Grid<f32>>,
    pub result: VesselnessResult,
    pub smoothing_ms: f64,
    pub evaluation_ms: f64,
}

impl<'a> ScaleTask<'a> {
    pub fn new(
        scale_index: usize,
        scale: f64,
        source: &'a Grid<f32>,
        params: ScoreParams,
        mode: SpacingMode,
    ) -> Self {
        let sigma = mode.sigma(scale, source.spacing());
        let derived_spacing = source
            .spacing()
            .iter()
            .zip(&sigma)
            .map(|(s, ratio)| s * ratio)
            .collect();
        Self {
            scale_index,
            scale,
            sigma,
            derived_spacing,
            source,
            params,
            keep_smoothed: false,
        }
    }

    pub fn keep_smoothed(mut self, keep: bool) -> Self {
        self.keep_smoothed = keep;
        self
    }

    /// Run the task; errors are not yet tagged with the scale index.
    pub fn run(self, progress: &dyn ProgressSink, cancel: &CancelToken) -> Result<ScaleOutput> {
        let index = self.scale_index;
        let smooth_start = Instant::now();
        let smoothed = smooth(self.source, &self.sigma)?;
        let smoothing_ms = elapsed_ms(smooth_start);

        let eval_start = Instant::now();
        let report = |fraction: f64| progress.report(index, fraction);
        let result = HessianEvaluator::new(self.params)
            .with_progress(&report)
            .with_cancel(cancel)
            .evaluate(&smoothed, &self.derived_spacing)?;
        let evaluation_ms = elapsed_ms(eval_start);

        debug!(
            "scale {index} (s={:.3}, sigma={:?}): smoothing {:.3} ms, evaluation {:.3} ms, range [{}, {}]",
            self.scale, self.sigma, smoothing_ms, evaluation_ms, result.min_score, result.max_score
        );

        Ok(ScaleOutput {
            scale_index: index,
            scale: self.scale,
            derived_spacing: self.derived_spacing,
            smoothed: self.keep_smoothed.then_some(smoothed),
            result,
            smoothing_ms,
            evaluation_ms,
        })
    }
}
