//! Real eigenvalues of small symmetric matrices, ordered by magnitude.
use nalgebra::{Matrix2, Matrix3};

/// Sort ascending by absolute value: `|λ1| <= |λ2| <= ...`.
#[inline]
pub fn sort_by_magnitude<const N: usize>(mut values: [f64; N]) -> [f64; N] {
    values.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
    values
}

/// Eigenvalues of a symmetric 2×2 matrix, or `None` if it has non-finite entries.
pub fn symmetric_eigenvalues_2(h: &Matrix2<f64>) -> Option<[f64; 2]> {
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let ev = h.symmetric_eigenvalues();
    Some(sort_by_magnitude([ev[0], ev[1]]))
}

/// Eigenvalues of a symmetric 3×3 matrix, or `None` if it has non-finite entries.
pub fn symmetric_eigenvalues_3(h: &Matrix3<f64>) -> Option<[f64; 3]> {
    if !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    let ev = h.symmetric_eigenvalues();
    Some(sort_by_magnitude([ev[0], ev[1], ev[2]]))
}
