//! Timing and per-scale summaries emitted alongside a filter run.
use crate::filter::VesselnessOutput;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock milliseconds spent in one pipeline stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTime {
    pub stage: String,
    pub ms: f64,
}

/// Stages of one filter run in execution order, plus the end-to-end time.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTiming {
    pub total_ms: f64,
    pub stages: Vec<StageTime>,
}

impl RunTiming {
    /// Close the stage begun at `started`; returns its duration in ms.
    pub fn record(&mut self, stage: &str, started: Instant) -> f64 {
        let ms = elapsed_ms(started);
        self.stages.push(StageTime {
            stage: stage.to_owned(),
            ms,
        });
        ms
    }

    pub fn stage_ms(&self, stage: &str) -> Option<f64> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| s.ms)
    }
}

/// Milliseconds since `started`.
pub fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSummary {
    pub scale_index: usize,
    pub scale: f64,
    pub derived_spacing: Vec<f64>,
    /// `None` when the scale produced no finite score.
    pub min_score: Option<f32>,
    pub max_score: Option<f32>,
    pub smoothing_ms: f64,
    pub evaluation_ms: f64,
}

/// JSON-friendly report of a whole run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub size: Vec<usize>,
    pub spacing: Vec<f64>,
    pub fused_min: f32,
    pub fused_max: f32,
    pub scales: Vec<ScaleSummary>,
    pub timing: RunTiming,
}

impl RunSummary {
    pub fn from_output(output: &VesselnessOutput) -> Self {
        let fused = &output.fusion.scores;
        Self {
            size: fused.size().to_vec(),
            spacing: fused.spacing().to_vec(),
            fused_min: output.fusion.min_score,
            fused_max: output.fusion.max_score,
            scales: output.scales.clone(),
            timing: output.timing.clone(),
        }
    }
}
