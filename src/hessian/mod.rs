//! Hessian-based vesselness evaluation for one smoothed grid (one scale).
//!
//! Pipeline per voxel
//! - Second derivatives from nested central differences: for each axis pair
//!   `(m, n)` two first differences along `m`, taken one step ahead of and
//!   one step behind the voxel along `n`, are differenced along `n`. Taps
//!   outside the grid mirror back inside.
//! - Eigenvalues of the symmetric `D×D` Hessian, ordered by magnitude.
//! - Frangi-style score ([`ScoreParams::score_2d`] / [`ScoreParams::score_3d`]).
//!
//! Non-finite scores (e.g. a zero Hessian) are stored as NaN and mean "no
//! contribution": they are skipped by the min/max tracking and by fusion.
//!
//! The voxel loop is split into rows along axis 0. With the `parallel` feature
//! rows are processed on the rayon pool; each row is a pure function of the
//! input, so the output does not depend on scheduling.
pub mod eigen;
mod params;

pub use params::{Polarity, ScoreParams};

use crate::cancel::CancelToken;
use crate::error::{Result, VesselnessError};
use crate::grid::{mirror_index, try_alloc, Grid, SUPPORTED_DIMS};
use eigen::{symmetric_eigenvalues_2, symmetric_eigenvalues_3};
use nalgebra::{Matrix2, Matrix3};
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Largest `f32` strictly below 1; stored scores never reach 1.
const MAX_STORED_SCORE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Roughly this many progress reports are emitted per evaluation.
const PROGRESS_REPORTS: usize = 100;

/// Per-scale output: scores plus the range of finite values.
#[derive(Clone, Debug)]
pub struct VesselnessResult {
    pub scores: Grid<f32>,
    /// Smallest finite score, `+inf` if there is none.
    pub min_score: f32,
    /// Largest finite score, `-inf` if there is none.
    pub max_score: f32,
}

impl VesselnessResult {
    /// True if at least one voxel produced a finite score.
    pub fn has_finite_scores(&self) -> bool {
        self.min_score <= self.max_score
    }

    /// Display window `(min, 0.5 * max)` used when rendering a score image.
    pub fn display_range(&self) -> Option<(f32, f32)> {
        self.has_finite_scores()
            .then(|| (self.min_score, 0.5 * self.max_score))
    }
}

/// Evaluates the vesselness measure with optional progress and cancellation.
#[derive(Clone, Copy)]
pub struct HessianEvaluator<'a> {
    params: ScoreParams,
    progress: Option<&'a (dyn Fn(f64) + Sync)>,
    cancel: Option<&'a CancelToken>,
}

impl<'a> HessianEvaluator<'a> {
    pub fn new(params: ScoreParams) -> Self {
        Self {
            params,
            progress: None,
            cancel: None,
        }
    }

    /// Receive the fraction of rows completed, in `(0, 1]`.
    pub fn with_progress(mut self, progress: &'a (dyn Fn(f64) + Sync)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Score every voxel of `grid`, using `spacing` for the finite differences.
    pub fn evaluate(&self, grid: &Grid<f32>, spacing: &[f64]) -> Result<VesselnessResult> {
        let dims = grid.dims();
        if !SUPPORTED_DIMS.contains(&dims) {
            return Err(VesselnessError::computation(format!(
                "vesselness is defined for 2-D and 3-D grids only, got {dims}-D"
            )));
        }
        if spacing.len() != dims {
            return Err(VesselnessError::computation(format!(
                "{} spacing values for a {dims}-D grid",
                spacing.len()
            )));
        }
        if let Some(s) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(VesselnessError::computation(format!(
                "finite-difference spacing must be finite and > 0, got {s}"
            )));
        }

        let len = grid.len();
        let mut data = try_alloc(len, 0.0f32)
            .map_err(|_| VesselnessError::exhausted(len * std::mem::size_of::<f32>()))?;

        let extent = grid.extent3();
        let row_len = extent[0];
        let rows = extent[1] * extent[2];
        let interval = (rows / PROGRESS_REPORTS).max(1);
        let rows_done = AtomicUsize::new(0);

        let process_row = |(row, out): (usize, &mut [f32])| -> Result<()> {
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(VesselnessError::cancelled());
            }
            let (y, z) = (row % extent[1], row / extent[1]);
            for (x, dst) in out.iter_mut().enumerate() {
                *dst = stored_score(self.score_at(grid, spacing, [x, y, z]));
            }
            let finished = rows_done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % interval == 0 {
                if let Some(report) = self.progress {
                    report(finished as f64 / rows as f64);
                }
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        data.par_chunks_mut(row_len)
            .enumerate()
            .try_for_each(process_row)?;
        #[cfg(not(feature = "parallel"))]
        data.chunks_mut(row_len)
            .enumerate()
            .try_for_each(process_row)?;

        let (min_score, max_score) = finite_range(&data);
        Ok(VesselnessResult {
            scores: grid.with_data(data)?,
            min_score,
            max_score,
        })
    }

    fn score_at(&self, grid: &Grid<f32>, spacing: &[f64], p: [usize; 3]) -> f64 {
        let h = hessian_at(grid, spacing, p);
        if grid.dims() == 2 {
            let m = Matrix2::new(h[0][0], h[0][1], h[1][0], h[1][1]);
            symmetric_eigenvalues_2(&m).map_or(f64::NAN, |l| self.params.score_2d(l))
        } else {
            let m = Matrix3::new(
                h[0][0], h[0][1], h[0][2], h[1][0], h[1][1], h[1][2], h[2][0], h[2][1], h[2][2],
            );
            symmetric_eigenvalues_3(&m).map_or(f64::NAN, |l| self.params.score_3d(l))
        }
    }
}

/// Score every voxel of `grid` without progress reporting.
pub fn evaluate(
    grid: &Grid<f32>,
    spacing: &[f64],
    params: &ScoreParams,
) -> Result<VesselnessResult> {
    HessianEvaluator::new(*params).evaluate(grid, spacing)
}

/// Finite-difference Hessian at `p`; only the leading `dims × dims` block is set.
pub(crate) fn hessian_at(grid: &Grid<f32>, spacing: &[f64], p: [usize; 3]) -> [[f64; 3]; 3] {
    let extent = grid.extent3();
    let strides = grid.strides3();
    let data = grid.data();
    let sample = |delta: [isize; 3]| -> f64 {
        let mut idx = 0usize;
        for axis in 0..3 {
            idx += mirror_index(p[axis] as isize + delta[axis], extent[axis]) * strides[axis];
        }
        f64::from(data[idx])
    };

    let dims = grid.dims();
    let mut h = [[0.0f64; 3]; 3];
    for m in 0..dims {
        for n in m..dims {
            let mut ahead = [0isize; 3];
            let mut behind = [0isize; 3];
            ahead[m] += 1;
            ahead[n] += 1;
            behind[m] -= 1;
            behind[n] += 1;
            let first_a = (sample(ahead) - sample(behind)) / (2.0 * spacing[m]);
            ahead[n] -= 2;
            behind[n] -= 2;
            let first_b = (sample(ahead) - sample(behind)) / (2.0 * spacing[m]);
            let value = (first_a - first_b) / (2.0 * spacing[n]);
            h[m][n] = value;
            h[n][m] = value;
        }
    }
    h
}

#[inline]
fn stored_score(v: f64) -> f32 {
    if v.is_nan() {
        f32::NAN
    } else {
        (v as f32).min(MAX_STORED_SCORE)
    }
}

fn finite_range(scores: &[f32]) -> (f32, f32) {
    scores
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_2d(n: usize, a: f64, b: f64, c: f64) -> Grid<f32> {
        // f = a/2 x² + b x y + c/2 y², centred on the grid.
        let mid = (n / 2) as f64;
        let mut data = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                let (dx, dy) = (x as f64 - mid, y as f64 - mid);
                data.push((0.5 * a * dx * dx + b * dx * dy + 0.5 * c * dy * dy) as f32);
            }
        }
        Grid::from_vec(&[n, n], &[1.0, 1.0], data).expect("valid grid")
    }

    fn horizontal_ridge(n: usize, width: f64, invert: bool) -> Grid<f32> {
        let mid = (n / 2) as f64;
        let mut data = Vec::with_capacity(n * n);
        for y in 0..n {
            let dy = y as f64 - mid;
            let v = (-(dy * dy) / (2.0 * width * width)).exp();
            let v = if invert { 1.0 - v } else { v };
            data.extend(std::iter::repeat(v as f32).take(n));
        }
        Grid::from_vec(&[n, n], &[1.0, 1.0], data).expect("valid grid")
    }

    #[test]
    fn hessian_of_quadratic_is_exact_in_interior() {
        let grid = quadratic_2d(11, 0.5, -0.25, 1.5);
        let h = hessian_at(&grid, &[1.0, 1.0], [5, 5, 0]);
        assert!((h[0][0] - 0.5).abs() < 1e-4);
        assert!((h[0][1] + 0.25).abs() < 1e-4);
        assert!((h[1][0] + 0.25).abs() < 1e-4);
        assert!((h[1][1] - 1.5).abs() < 1e-4);
    }

    #[test]
    fn hessian_divides_by_spacing() {
        let grid = quadratic_2d(11, 0.5, 0.0, 1.5);
        let h = hessian_at(&grid, &[2.0, 0.5], [5, 5, 0]);
        assert!((h[0][0] - 0.5 / 4.0).abs() < 1e-4);
        assert!((h[1][1] - 1.5 / 0.25).abs() < 1e-3);
    }

    #[test]
    fn hessian_mirrors_taps_at_planar_edges() {
        // v = x³ + 10y on a 4×3 grid; at x = 3 the +2 tap reflects onto x = 1.
        let data = (0..3)
            .flat_map(|y| (0..4).map(move |x| (x * x * x + 10 * y) as f32))
            .collect();
        let grid = Grid::from_vec(&[4, 3], &[1.0, 1.0], data).expect("valid grid");
        let h = hessian_at(&grid, &[1.0, 1.0], [3, 0, 0]);
        assert_eq!(h[0][0], (1.0 - 2.0 * 27.0 + 1.0) / 4.0);
        assert_eq!(h[1][1], (20.0 - 0.0 + 20.0) / 4.0);
        assert_eq!(h[0][1], 0.0);
        assert_eq!(h[1][0], 0.0);
    }

    #[test]
    fn hessian_mirrors_taps_at_volume_corner() {
        // v = x³ + 10y + 100z on 3×3×3, evaluated at (0, 2, 0).
        let mut data = Vec::with_capacity(27);
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    data.push((x * x * x + 10 * y + 100 * z) as f32);
                }
            }
        }
        let grid = Grid::from_vec(&[3, 3, 3], &[1.0, 1.0, 1.0], data).expect("valid grid");
        let h = hessian_at(&grid, &[1.0, 1.0, 1.0], [0, 2, 0]);
        // -2 → 2 on x and z, +2 → 0 on y.
        assert_eq!(h[0][0], 4.0);
        assert_eq!(h[1][1], -10.0);
        assert_eq!(h[2][2], 100.0);
        for (m, n) in [(0, 1), (0, 2), (1, 2)] {
            assert_eq!(h[m][n], 0.0, "h[{m}][{n}]");
            assert_eq!(h[n][m], 0.0, "h[{n}][{m}]");
        }
    }

    #[test]
    fn bright_ridge_scores_on_centre_only() {
        let grid = horizontal_ridge(21, 1.5, false);
        let result = evaluate(&grid, &[1.0, 1.0], &ScoreParams::default()).expect("evaluates");
        let at = |x: usize, y: usize| result.scores.data()[y * 21 + x];
        assert!(at(10, 10) > 0.0);
        assert!(at(10, 10) < 1.0);
        assert_eq!(at(10, 16), 0.0);
        assert!(result.has_finite_scores());
        assert!(result.max_score >= at(10, 10));
        assert!(result.min_score >= 0.0);
    }

    #[test]
    fn dark_ridge_needs_dark_polarity() {
        let grid = horizontal_ridge(21, 1.5, true);
        let bright = evaluate(&grid, &[1.0, 1.0], &ScoreParams::default()).expect("evaluates");
        let dark_params = ScoreParams {
            polarity: Polarity::Dark,
            ..ScoreParams::default()
        };
        let dark = evaluate(&grid, &[1.0, 1.0], &dark_params).expect("evaluates");
        let centre = 10 * 21 + 10;
        assert_eq!(bright.scores.data()[centre], 0.0);
        assert!(dark.scores.data()[centre] > 0.0);
    }

    #[test]
    fn flat_grid_contributes_nothing() {
        let grid = Grid::filled(&[5, 4, 3], &[1.0, 1.0, 1.0], 2.5f32).expect("valid grid");
        let result = evaluate(&grid, &[1.0, 1.0, 1.0], &ScoreParams::default()).expect("evaluates");
        assert!(result.scores.data().iter().all(|v| v.is_nan()));
        assert!(!result.has_finite_scores());
        assert_eq!(result.display_range(), None);
    }

    #[test]
    fn stored_scores_stay_below_one() {
        assert!(stored_score(1.0) < 1.0);
        assert!(stored_score(f64::NAN).is_nan());
        assert_eq!(stored_score(0.25), 0.25);
    }

    #[test]
    fn progress_reaches_completion() {
        use std::sync::Mutex;
        let grid = horizontal_ridge(16, 2.0, false);
        let seen = Mutex::new(Vec::new());
        let report = |f: f64| seen.lock().expect("lock").push(f);
        HessianEvaluator::new(ScoreParams::default())
            .with_progress(&report)
            .evaluate(&grid, &[1.0, 1.0])
            .expect("evaluates");
        let seen = seen.into_inner().expect("lock");
        assert_eq!(seen.len(), 16);
        assert!(seen.iter().all(|f| *f > 0.0 && *f <= 1.0));
        assert!(seen.iter().any(|f| (*f - 1.0).abs() < 1e-12));
    }

    #[test]
    fn cancelled_token_stops_evaluation() {
        let grid = horizontal_ridge(8, 1.0, false);
        let token = CancelToken::new();
        token.cancel();
        let err = HessianEvaluator::new(ScoreParams::default())
            .with_cancel(&token)
            .evaluate(&grid, &[1.0, 1.0])
            .expect_err("cancelled");
        assert!(matches!(err, VesselnessError::Cancelled { .. }));
    }

    #[test]
    fn spacing_must_match_dimensionality() {
        let grid = Grid::filled(&[4, 4], &[1.0, 1.0], 0.0f32).expect("valid grid");
        assert!(matches!(
            evaluate(&grid, &[1.0, 1.0, 1.0], &ScoreParams::default()),
            Err(VesselnessError::ComputationFailure { .. })
        ));
    }
}
