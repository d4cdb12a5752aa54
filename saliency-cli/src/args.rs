//! Command-line argument definitions for saliency-cli.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Generate attention heatmaps and design analyses for images.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct AnalyzeArgs {
    /// Path to an image file or a directory containing images.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to the saliency ONNX model.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Generic classifier ONNX model loaded when the saliency model fails.
    #[arg(long)]
    pub fallback_model: Option<PathBuf>,

    /// Optional settings JSON (defaults to built-in parameters).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the activation threshold.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Override the maximum number of reported attention points.
    #[arg(long)]
    pub max_points: Option<usize>,

    /// Abandon inference after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Override input width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Override input height (pixels).
    #[arg(long)]
    pub height: Option<u32>,

    /// Resize quality mode: `quality` (bilinear) or `speed` (fast Nearest).
    #[arg(long, value_name = "MODE")]
    pub resize_quality: Option<saliency_utils::config::ResizeQuality>,

    /// Write analysis records to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Directory to write rendered heatmap overlays.
    #[arg(long)]
    pub heatmap_dir: Option<PathBuf>,

    /// Directory to write input copies with attention points marked.
    #[arg(long)]
    pub annotate: Option<PathBuf>,

    /// Enable telemetry timing logs.
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,
}
