//! Multi-scale vesselness on a grayscale PNG.
//!
//! Reads a JSON config (input image, pixel spacing, filter parameters and
//! output paths), runs the filter and writes the fused score image, the
//! optional scale-index map and per-scale images, and a JSON run summary.
//!
//!   RUST_LOG=debug cargo run --release --bin vesselness_demo -- config.json

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};
use vessel_detector::config::load_config;
use vessel_detector::diagnostics::RunSummary;
use vessel_detector::grid::io::{load_grayscale_grid, save_grid_png, save_index_png, write_json_file};
use vessel_detector::{VesselnessFilter, VesselnessOutput};

#[derive(Parser, Debug)]
#[command(about = "Multi-scale Hessian vesselness filter for grayscale images")]
struct Args {
    /// JSON config describing input, parameters and outputs
    config: PathBuf,

    /// Override the worker thread count from the config (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Print progress to stderr
    #[arg(long)]
    progress: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(threads) = args.threads {
        config.params.threads = threads;
    }

    let grid = load_grayscale_grid(&config.input, config.spacing)?;
    info!(
        "loaded {} ({}x{}, spacing {:?})",
        config.input.display(),
        grid.size()[0],
        grid.size()[1],
        grid.spacing()
    );

    let filter = VesselnessFilter::new(config.params.clone()).context("invalid filter parameters")?;
    let output = if args.progress {
        filter.process_with_progress(&grid, |f| eprint!("\rprogress {:5.1}%", f * 100.0))
    } else {
        filter.process(&grid)
    }
    .context("vesselness filter failed")?;
    if args.progress {
        eprintln!();
    }

    let out = &config.output;
    save_grid_png(output.fused(), output.fusion.display_range(), &out.fused_image)?;
    println!("Saved fused vesselness to {}", out.fused_image.display());

    if let (Some(path), Some(map)) = (&out.scale_index_image, output.scale_index_map()) {
        save_index_png(map, config.params.scale_count, path)?;
        println!("Saved scale index map to {}", path.display());
    }

    if let Some(dir) = &out.per_scale_dir {
        save_per_scale(&output, dir)?;
    }

    write_json_file(&out.summary_json, &RunSummary::from_output(&output))?;
    println!(
        "Saved run summary to {} (total {:.2} ms)",
        out.summary_json.display(),
        output.timing.total_ms
    );
    Ok(())
}

fn save_per_scale(output: &VesselnessOutput, dir: &Path) -> Result<()> {
    for entry in &output.per_scale {
        if let Some(smoothed) = &entry.smoothed {
            let path = dir.join(format!("smoothed_{:02}.png", entry.scale_index + 1));
            save_grid_png(smoothed, value_range(smoothed.data()), &path)
                .with_context(|| format!("scale {}", entry.scale_index))?;
        }
        if let Some(filtered) = &entry.filtered {
            let path = dir.join(format!("filtered_{:02}.png", entry.scale_index + 1));
            let range = filtered.display_range().unwrap_or((0.0, 1.0));
            save_grid_png(&filtered.scores, range, &path)
                .with_context(|| format!("scale {}", entry.scale_index))?;
        }
    }
    println!(
        "Saved {} per-scale outputs to {}",
        output.per_scale.len(),
        dir.display()
    );
    Ok(())
}

fn value_range(data: &[f32]) -> (f32, f32) {
    data.iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
