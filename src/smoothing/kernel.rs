use crate::error::{Result, VesselnessError};
use std::f64::consts::PI;

/// Dual-series terms below this weight are dropped.
const SERIES_EPS: f64 = 1e-18;

/// Sampled, normalised 1-D Gaussian for one axis of a grid.
///
/// Conventions:
/// - `radius = max(1, round(3*sigma))`, so the support covers ±3σ.
/// - Mirrored lookups repeat with period `2*len - 2`. A kernel wider than
///   that is folded onto one period: `radius` becomes `len - 1` and the taps
///   hold the periodised Gaussian, so tap storage never exceeds `2*len - 1`.
/// - `taps` has `2*radius + 1` entries, symmetric, and sums to ~1.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    pub sigma: f64,
    pub radius: usize,
    pub taps: Vec<f64>,
}

impl GaussianKernel {
    /// Kernel for smoothing an axis of `len` samples.
    pub fn new(sigma: f64, len: usize) -> Result<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(VesselnessError::computation(format!(
                "sigma must be finite and > 0, got {sigma}"
            )));
        }
        if len <= 1 {
            return Ok(Self {
                sigma,
                radius: 0,
                taps: vec![1.0],
            });
        }

        let half_period = len - 1;
        // Saturating float-to-int cast: huge sigma lands on usize::MAX.
        let full_radius = ((3.0 * sigma + 0.5) as usize).max(1);
        let radius = full_radius.min(half_period);
        let mut taps = Vec::new();
        taps.try_reserve_exact(2 * radius + 1).map_err(|_| {
            VesselnessError::computation(format!("cannot allocate {} kernel taps", 2 * radius + 1))
        })?;

        if full_radius <= half_period {
            let denom = 2.0 * sigma * sigma;
            taps.extend((0..=2 * radius).map(|i| {
                let x = i as f64 - radius as f64;
                (-(x * x) / denom).exp()
            }));
        } else {
            let weight = periodised_weights(sigma, 2 * half_period);
            taps.extend((0..=2 * radius).map(|i| {
                let m = i.abs_diff(radius);
                // Offsets ±(len-1) alias the same sample; they share its weight.
                if m == half_period {
                    0.5 * weight(m)
                } else {
                    weight(m)
                }
            }));
        }

        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Ok(Self {
            sigma,
            radius,
            taps,
        })
    }
}

/// Unnormalised `Σ_n g(m + n·period)` for a Gaussian `g` of width `sigma`,
/// evaluated through its Fourier series (fast when `sigma` is comparable to
/// or larger than `period`).
fn periodised_weights(sigma: f64, period: usize) -> impl Fn(usize) -> f64 {
    let p = period as f64;
    let decay = 2.0 * PI * PI * sigma * sigma / (p * p);
    let coeffs: Vec<f64> = (1..)
        .map(|k: u32| (-decay * f64::from(k * k)).exp())
        .take_while(|&c| c > SERIES_EPS)
        .take(64)
        .collect();
    move |m| {
        let phase = 2.0 * PI * m as f64 / p;
        1.0 + 2.0
            * coeffs
                .iter()
                .enumerate()
                .map(|(k, c)| c * ((k + 1) as f64 * phase).cos())
                .sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::GaussianKernel;
    use crate::error::VesselnessError;

    #[test]
    fn normalised_and_symmetric() {
        let k = GaussianKernel::new(1.7, 64).expect("positive sigma");
        assert_eq!(k.radius, 5);
        assert_eq!(k.taps.len(), 11);
        let sum: f64 = k.taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for i in 1..=k.radius {
            assert!((k.taps[k.radius + i] - k.taps[k.radius - i]).abs() < 1e-15);
        }
        assert!(k.taps[k.radius] > k.taps[k.radius + 1]);
    }

    #[test]
    fn tiny_sigma_keeps_minimum_radius() {
        let k = GaussianKernel::new(0.1, 16).expect("positive sigma");
        assert_eq!(k.radius, 1);
    }

    #[test]
    fn rejects_degenerate_sigma() {
        for sigma in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                GaussianKernel::new(sigma, 8),
                Err(VesselnessError::ComputationFailure { .. })
            ));
        }
    }

    #[test]
    fn wide_kernel_folds_onto_axis_period() {
        let k = GaussianKernel::new(1.0e10, 8).expect("folded kernel");
        assert_eq!(k.radius, 7);
        assert_eq!(k.taps.len(), 15);
        let sum: f64 = k.taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // Practically flat over one period of 14 samples; edge taps share a sample.
        let flat = 1.0 / 14.0;
        for (i, &t) in k.taps.iter().enumerate() {
            let want = if i == 0 || i == 14 { 0.5 * flat } else { flat };
            assert!((t - want).abs() < 1e-12, "tap {i} = {t}");
        }
    }

    #[test]
    fn folding_matches_direct_sum_when_kernel_just_wraps() {
        // sigma 2.5 on 5 samples: radius 8 > len - 1, period 8.
        let (sigma, len) = (2.5f64, 5usize);
        let k = GaussianKernel::new(sigma, len).expect("folded kernel");
        assert_eq!(k.radius, len - 1);

        let period = 2 * len as i64 - 2;
        let class_weight = |m: i64| -> f64 {
            (-200..=200)
                .map(|n| {
                    let x = (m + n * period) as f64;
                    (-(x * x) / (2.0 * sigma * sigma)).exp()
                })
                .sum()
        };
        let total: f64 = (0..period).map(class_weight).sum();
        assert!((k.taps[k.radius] - class_weight(0) / total).abs() < 1e-12);
        assert!((k.taps[k.radius + 2] - class_weight(2) / total).abs() < 1e-12);
        assert!((k.taps[0] - 0.5 * class_weight(4) / total).abs() < 1e-12);
    }

    #[test]
    fn single_sample_axis_is_identity() {
        let k = GaussianKernel::new(3.0, 1).expect("positive sigma");
        assert_eq!((k.radius, k.taps.as_slice()), (0, [1.0].as_slice()));
    }
}
