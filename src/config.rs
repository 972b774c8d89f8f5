//! JSON configuration for the `vesselness_demo` tool.
use crate::filter::VesselnessParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
pub struct DemoConfig {
    /// Grayscale PNG treated as a 2-D grid.
    pub input: PathBuf,
    /// Physical pixel size `[x, y]`.
    #[serde(default = "unit_spacing")]
    pub spacing: [f64; 2],
    #[serde(default)]
    pub params: VesselnessParams,
    pub output: DemoOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct DemoOutputConfig {
    pub fused_image: PathBuf,
    #[serde(default)]
    pub scale_index_image: Option<PathBuf>,
    /// Directory for per-scale smoothed / filtered PNGs, if requested.
    #[serde(default)]
    pub per_scale_dir: Option<PathBuf>,
    pub summary_json: PathBuf,
}

fn unit_spacing() -> [f64; 2] {
    [1.0, 1.0]
}

pub fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
