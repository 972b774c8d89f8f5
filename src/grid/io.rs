//! I/O helpers for grayscale images and JSON.
//!
//! - `load_grayscale_grid`: read a PNG into a 2-D `Grid<f32>` with values in [0,1].
//! - `save_grid_png`: write a 2-D `Grid<f32>` to an 8-bit PNG over a display range.
//! - `save_index_png`: write a 2-D scale-index map, stretched over `0..=255`.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::Grid;
use crate::error::VesselnessError;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read image {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write image {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to serialize JSON for {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("only 2-D grids can be written as images, got {0} axes")]
    NotPlanar(usize),
    #[error(transparent)]
    Grid(#[from] VesselnessError),
}

/// Load an image from disk as a 2-D grid of luminance values in `[0, 1]`.
pub fn load_grayscale_grid(path: &Path, spacing: [f64; 2]) -> Result<Grid<f32>, IoError> {
    let img = image::open(path)
        .map_err(|source| IoError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma16();
    let size = [img.width() as usize, img.height() as usize];
    let data = img
        .into_raw()
        .into_iter()
        .map(|v| f32::from(v) / f32::from(u16::MAX))
        .collect();
    Ok(Grid::from_vec(&size, &spacing, data)?)
}

/// Save a 2-D float grid as an 8-bit PNG, mapping `[lo, hi]` onto `[0, 255]`.
///
/// Values outside the range saturate; non-finite values are written as 0.
pub fn save_grid_png(grid: &Grid<f32>, range: (f32, f32), path: &Path) -> Result<(), IoError> {
    let (w, h) = planar_extent(grid.dims(), grid.size())?;
    let (lo, hi) = range;
    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut out = GrayImage::new(w, h);
    for (px, &v) in out.pixels_mut().zip(grid.data()) {
        let scaled = if v.is_finite() {
            ((v - lo) / span * 255.0).clamp(0.0, 255.0)
        } else {
            0.0
        };
        *px = Luma([scaled as u8]);
    }
    save_gray(&out, path)
}

/// Save a 2-D scale-index map, stretched so the last scale renders white.
pub fn save_index_png(grid: &Grid<u8>, scale_count: usize, path: &Path) -> Result<(), IoError> {
    let (w, h) = planar_extent(grid.dims(), grid.size())?;
    let denom = scale_count.max(1);
    let mut out = GrayImage::new(w, h);
    for (px, &idx) in out.pixels_mut().zip(grid.data()) {
        *px = Luma([((usize::from(idx) * 255) / denom).min(255) as u8]);
    }
    save_gray(&out, path)
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn save_gray(image: &GrayImage, path: &Path) -> Result<(), IoError> {
    ensure_parent_dir(path)?;
    image.save(path).map_err(|source| IoError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

fn planar_extent(dims: usize, size: &[usize]) -> Result<(u32, u32), IoError> {
    if dims != 2 {
        return Err(IoError::NotPlanar(dims));
    }
    Ok((size[0] as u32, size[1] as u32))
}

fn ensure_parent_dir(path: &Path) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| IoError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}
