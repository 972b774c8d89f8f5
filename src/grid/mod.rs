//! Owned n-dimensional scalar grid with physical per-axis spacing.
//!
//! Layout is dense with axis 0 varying fastest (`x`, then `y`, then `z`), the
//! n-D analogue of a row-major image with `stride == width`. Only 2-D and 3-D
//! grids can be constructed; 2-D grids behave as a single `z` slice wherever
//! the pipeline iterates in three dimensions.
//!
//! Spacing is fixed at construction. Deriving a grid with different contents
//! (`with_data`) copies the geometry; nothing mutates it in place.
pub mod border;
pub mod io;

use crate::error::{Result, VesselnessError};

pub use border::mirror_index;

/// Dimensionalities for which the vesselness measure is defined.
pub const SUPPORTED_DIMS: [usize; 2] = [2, 3];

#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T = f32> {
    size: Vec<usize>,
    spacing: Vec<f64>,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Wrap `data` as a grid with the given extents and spacing.
    pub fn from_vec(size: &[usize], spacing: &[f64], data: Vec<T>) -> Result<Self> {
        let expected = validate_geometry(size, spacing)?;
        if data.len() != expected {
            return Err(VesselnessError::invalid(format!(
                "buffer holds {} elements but extents {:?} require {expected}",
                data.len(),
                size
            )));
        }
        Ok(Self {
            size: size.to_vec(),
            spacing: spacing.to_vec(),
            data,
        })
    }

    /// Same geometry, different contents.
    pub fn with_data<U>(&self, data: Vec<U>) -> Result<Grid<U>> {
        if data.len() != self.data.len() {
            return Err(VesselnessError::computation(format!(
                "buffer of {} elements does not match grid of {}",
                data.len(),
                self.data.len()
            )));
        }
        Ok(Grid {
            size: self.size.clone(),
            spacing: self.spacing.clone(),
            data,
        })
    }

    #[inline]
    pub fn dims(&self) -> usize {
        self.size.len()
    }

    #[inline]
    pub fn size(&self) -> &[usize] {
        &self.size
    }

    #[inline]
    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// True when both grids have identical extents.
    pub fn same_shape<U>(&self, other: &Grid<U>) -> bool {
        self.size == other.size
    }

    /// Extents padded to three axes (`z == 1` for 2-D grids).
    #[inline]
    pub fn extent3(&self) -> [usize; 3] {
        let mut out = [1usize; 3];
        out[..self.size.len()].copy_from_slice(&self.size);
        out
    }

    /// Element strides padded to three axes.
    #[inline]
    pub fn strides3(&self) -> [usize; 3] {
        let [nx, ny, _] = self.extent3();
        [1, nx, nx * ny]
    }

    /// Linear index of `coords` (one entry per axis), if inside the grid.
    pub fn offset(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.dims() {
            return None;
        }
        let strides = self.strides3();
        let mut idx = 0usize;
        for (axis, (&c, &n)) in coords.iter().zip(&self.size).enumerate() {
            if c >= n {
                return None;
            }
            idx += c * strides[axis];
        }
        Some(idx)
    }

    pub fn get(&self, coords: &[usize]) -> Option<&T> {
        self.offset(coords).map(|i| &self.data[i])
    }
}

impl<T: Clone> Grid<T> {
    /// Grid filled with `value`.
    pub fn filled(size: &[usize], spacing: &[f64], value: T) -> Result<Self> {
        let len = validate_geometry(size, spacing)?;
        let data = try_alloc(len, value).map_err(|_| {
            VesselnessError::exhausted(len.saturating_mul(std::mem::size_of::<T>()))
        })?;
        Self::from_vec(size, spacing, data)
    }
}

/// Allocate `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_alloc<T: Clone>(
    len: usize,
    value: T,
) -> std::result::Result<Vec<T>, std::collections::TryReserveError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, value);
    Ok(buf)
}

fn validate_geometry(size: &[usize], spacing: &[f64]) -> Result<usize> {
    if !SUPPORTED_DIMS.contains(&size.len()) {
        return Err(VesselnessError::invalid(format!(
            "only 2-D and 3-D grids are supported, got {} axes",
            size.len()
        )));
    }
    if spacing.len() != size.len() {
        return Err(VesselnessError::invalid(format!(
            "{} spacing values for {} axes",
            spacing.len(),
            size.len()
        )));
    }
    if let Some(axis) = size.iter().position(|&n| n == 0) {
        return Err(VesselnessError::invalid(format!("axis {axis} has zero extent")));
    }
    if let Some((axis, s)) = spacing
        .iter()
        .enumerate()
        .find(|(_, s)| !(s.is_finite() && **s > 0.0))
    {
        return Err(VesselnessError::invalid(format!(
            "spacing along axis {axis} must be finite and > 0, got {s}"
        )));
    }
    size.iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| VesselnessError::invalid(format!("extents {size:?} overflow usize")))
}
