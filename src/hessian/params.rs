use crate::error::{Result, VesselnessError};
use serde::{Deserialize, Serialize};

/// Which tubes respond: bright on dark background, or dark on bright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Bright,
    Dark,
}

/// Constants of the vesselness measure.
///
/// - `alpha`: plate-vs-line sensitivity (`Ra` term, 3-D only).
/// - `beta`: blob-vs-line sensitivity (`Rb` term).
/// - `c_2d` / `c_3d`: second-order structureness scale (`S` term) for planar
///   and volumetric grids respectively.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreParams {
    pub alpha: f64,
    pub beta: f64,
    pub c_2d: f64,
    pub c_3d: f64,
    pub polarity: Polarity,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.5,
            c_2d: 15.0,
            c_3d: 500.0,
            polarity: Polarity::Bright,
        }
    }
}

impl ScoreParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("c_2d", self.c_2d),
            ("c_3d", self.c_3d),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(VesselnessError::invalid(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    fn rejects(&self, lambda: f64) -> bool {
        match self.polarity {
            Polarity::Bright => lambda > 0.0,
            Polarity::Dark => lambda < 0.0,
        }
    }

    /// Planar score from eigenvalues sorted by ascending magnitude.
    ///
    /// Returns NaN when `λ2 == 0` (no contribution).
    pub fn score_2d(&self, [l1, l2]: [f64; 2]) -> f64 {
        if self.rejects(l2) {
            return 0.0;
        }
        let rb = l1 / l2;
        let s2 = l1 * l1 + l2 * l2;
        let blob = (-(rb * rb) / (2.0 * self.beta * self.beta)).exp();
        let structure = -(-s2 / (2.0 * self.c_2d * self.c_2d)).exp_m1();
        blob * structure
    }

    /// Volumetric score from eigenvalues sorted by ascending magnitude.
    ///
    /// Returns NaN when `λ3 == 0` or `λ2 == 0` (no contribution).
    pub fn score_3d(&self, [l1, l2, l3]: [f64; 3]) -> f64 {
        if self.rejects(l2) || self.rejects(l3) {
            return 0.0;
        }
        let rb = l1.abs() / (l2 * l3).abs().sqrt();
        let ra = l2.abs() / l3.abs();
        let s2 = l1 * l1 + l2 * l2 + l3 * l3;
        let plate = -(-(ra * ra) / (2.0 * self.alpha * self.alpha)).exp_m1();
        let blob = (-(rb * rb) / (2.0 * self.beta * self.beta)).exp();
        let structure = -(-s2 / (2.0 * self.c_3d * self.c_3d)).exp_m1();
        plate * blob * structure
    }
}

#[cfg(test)]
mod tests {
    use super::{Polarity, ScoreParams};
    use crate::error::VesselnessError;

    #[test]
    fn planar_positive_second_eigenvalue_is_suppressed() {
        let p = ScoreParams::default();
        assert_eq!(p.score_2d([0.1, 2.0]), 0.0);
        assert!(p.score_2d([0.1, -2.0]) > 0.0);
    }

    #[test]
    fn planar_line_profile_beats_blob_profile() {
        let p = ScoreParams::default();
        let line = p.score_2d([0.0, -5.0]);
        let blob = p.score_2d([-5.0, -5.0]);
        assert!(line > blob);
    }

    #[test]
    fn volumetric_requires_both_large_eigenvalues_negative() {
        let p = ScoreParams::default();
        assert_eq!(p.score_3d([0.0, -1.0, 2.0]), 0.0);
        assert_eq!(p.score_3d([0.0, 1.0, -2.0]), 0.0);
        assert!(p.score_3d([0.0, -1.0, -2.0]) > 0.0);
    }

    #[test]
    fn degenerate_eigenvalues_give_no_contribution() {
        let p = ScoreParams::default();
        assert!(p.score_2d([0.0, 0.0]).is_nan());
        assert!(p.score_3d([0.0, 0.0, 0.0]).is_nan());
    }

    #[test]
    fn dark_polarity_flips_sign_test() {
        let p = ScoreParams {
            polarity: Polarity::Dark,
            ..ScoreParams::default()
        };
        assert_eq!(p.score_2d([0.0, -3.0]), 0.0);
        assert!(p.score_2d([0.0, 3.0]) > 0.0);
        assert!(p.score_3d([0.1, 3.0, 4.0]) > 0.0);
    }

    #[test]
    fn finite_scores_stay_in_unit_interval() {
        // Raw f64 scores may saturate to exactly 1.0 for very strong planar
        // responses; the evaluator clamps below 1 when storing.
        let p = ScoreParams::default();
        let values = [-700.0, -35.0, -2.0, -0.25, -1e-3, 0.0, 1e-3, 0.5, 9.0];
        for &a in &values {
            for &b in &values {
                for &c in &values {
                    let mut l = [a, b, c];
                    l.sort_by(|x: &f64, y: &f64| x.abs().total_cmp(&y.abs()));
                    let v = p.score_3d(l);
                    if v.is_finite() {
                        assert!((0.0..1.0).contains(&v), "score {v} for {l:?}");
                    }
                }
                let mut l = [a, b];
                l.sort_by(|x: &f64, y: &f64| x.abs().total_cmp(&y.abs()));
                let v = p.score_2d(l);
                if v.is_finite() {
                    assert!((0.0..=1.0).contains(&v), "score {v} for {l:?}");
                }
            }
        }
    }

    #[test]
    fn validate_rejects_non_positive_constants() {
        let p = ScoreParams {
            beta: 0.0,
            ..ScoreParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(VesselnessError::InvalidParameter(_))
        ));
        assert!(ScoreParams::default().validate().is_ok());
    }
}
