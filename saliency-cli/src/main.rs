mod annotate;
mod args;

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use saliency_core::{
    AnalysisConfig, AttentionPoint, DesignAnalysis, ModelProvider, PreprocessConfig,
    SaliencyAnalyzer,
};
use saliency_utils::{config::AppSettings, init_logging, normalize_path, set_telemetry_enabled};

use crate::annotate::annotate_image;
use crate::args::AnalyzeArgs;

#[derive(Debug, Serialize)]
struct AnalysisRecord {
    image: String,
    width: u32,
    height: u32,
    visual_flow: Option<String>,
    dominant_areas: Vec<String>,
    attention_points: Vec<AttentionPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    heatmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotated: Option<String>,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = AnalyzeArgs::parse();
    if args.telemetry {
        set_telemetry_enabled(true);
    }

    let input_path = normalize_path(&args.input)?;
    let heatmap_dir = prepare_output_dir(args.heatmap_dir.as_ref())?;
    let annotate_dir = prepare_output_dir(args.annotate.as_ref())?;

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);

    let preprocess: PreprocessConfig = (&settings.input).into();
    let analysis = AnalysisConfig::from_settings(&settings.analysis, settings.render.clone());

    info!(
        "Loading saliency model from {} ({}x{} input)",
        settings.model.primary_path.display(),
        settings.input.width,
        settings.input.height
    );
    let provider = Arc::new(ModelProvider::with_fallback(
        settings.model.primary_path.clone(),
        settings.model.fallback_path.clone(),
    ));
    let analyzer = SaliencyAnalyzer::new(provider, preprocess, analysis);

    let images = collect_images(&input_path)?;
    if images.is_empty() {
        anyhow::bail!(
            "no images found at {} (supported extensions: jpg, jpeg, png, bmp)",
            input_path.display()
        );
    }

    info!("Analyzing {} image(s)...", images.len());
    let mut records = Vec::with_capacity(images.len());
    for image_path in images {
        records.push(analyze_one(
            &analyzer,
            &image_path,
            heatmap_dir.as_deref(),
            annotate_dir.as_deref(),
        ));
    }

    if let Some(json_path) = args.json.as_ref() {
        let file = File::create(json_path)
            .with_context(|| format!("failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records)
            .context("failed to serialize analysis records")?;
        info!("Wrote {} record(s) to {}", records.len(), json_path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    Ok(())
}

fn analyze_one(
    analyzer: &SaliencyAnalyzer,
    image_path: &Path,
    heatmap_dir: Option<&Path>,
    annotate_dir: Option<&Path>,
) -> AnalysisRecord {
    let display = image_path.display().to_string();

    // A decode failure is the caller's error path, not the pipeline's.
    let image = match image::open(image_path) {
        Ok(image) => image,
        Err(err) => {
            warn!("{display}: failed to load image: {err}");
            return AnalysisRecord {
                image: display,
                width: 0,
                height: 0,
                visual_flow: None,
                dominant_areas: Vec::new(),
                attention_points: Vec::new(),
                error: Some(format!("failed to load image: {err}")),
                heatmap: None,
                annotated: None,
            };
        }
    };

    let analysis = analyzer.analyze(&image);
    match analysis.heatmap.error.as_deref() {
        Some(err) => warn!("{display}: {err}"),
        None => info!(
            "{display}: {} attention point(s), {}",
            analysis.heatmap.attention_points.len(),
            analysis.visual_flow
        ),
    }

    let heatmap = heatmap_dir.and_then(|dir| {
        if analysis.heatmap.heatmap_url.is_empty() {
            return None;
        }
        match write_overlay(&analysis.heatmap.heatmap_url, image_path, dir) {
            Ok(path) => Some(path.display().to_string()),
            Err(err) => {
                warn!("{display}: failed to export heatmap overlay: {err:#}");
                None
            }
        }
    });

    let annotated = annotate_dir.and_then(|dir| {
        match annotate_image(&image, image_path, &analysis.heatmap.attention_points, dir) {
            Ok(path) => Some(path.display().to_string()),
            Err(err) => {
                warn!("{display}: failed to annotate image: {err:#}");
                None
            }
        }
    });

    record_from_analysis(display, analysis, heatmap, annotated)
}

fn record_from_analysis(
    image: String,
    analysis: DesignAnalysis,
    heatmap: Option<String>,
    annotated: Option<String>,
) -> AnalysisRecord {
    AnalysisRecord {
        image,
        width: analysis.image_size.width,
        height: analysis.image_size.height,
        visual_flow: Some(analysis.visual_flow.description().to_string()),
        dominant_areas: analysis.dominant_areas,
        attention_points: analysis.heatmap.attention_points,
        error: analysis.heatmap.error,
        heatmap,
        annotated,
    }
}

/// Decode a `data:image/png;base64,` URI and write the payload next to the
/// source image's name under `output_dir`.
fn write_overlay(data_url: &str, image_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let payload = data_url
        .strip_prefix("data:image/png;base64,")
        .context("heatmap reference is not a PNG data URI")?;
    let bytes = BASE64
        .decode(payload)
        .context("heatmap data URI payload is not valid base64")?;

    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("heatmap");
    let output_path = output_dir.join(format!("{stem}_heatmap.png"));
    fs::write(&output_path, bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    Ok(output_path)
}

fn prepare_output_dir(dir: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    match dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
            Ok(Some(normalize_path(dir)?))
        }
        None => Ok(None),
    }
}

fn load_settings(config: Option<&PathBuf>) -> Result<AppSettings> {
    match config {
        Some(path) => AppSettings::load(path),
        None => Ok(AppSettings::default()),
    }
}

fn apply_cli_overrides(settings: &mut AppSettings, args: &AnalyzeArgs) {
    if let Some(model) = args.model.as_ref() {
        settings.model.primary_path = model.clone();
    }
    if let Some(fallback) = args.fallback_model.as_ref() {
        settings.model.fallback_path = Some(fallback.clone());
    }
    if let Some(threshold) = args.threshold {
        settings.analysis.activation_threshold = threshold.clamp(0.0, 1.0);
    }
    if let Some(max_points) = args.max_points {
        settings.analysis.max_attention_points = max_points;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.analysis.inference_timeout_ms = Some(timeout_ms);
    }
    if let Some(width) = args.width {
        settings.input.width = width;
    }
    if let Some(height) = args.height {
        settings.input.height = height;
    }
    if let Some(quality) = args.resize_quality {
        settings.input.resize_quality = quality;
    }
}

fn collect_images(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                matches!(
                    ext.to_ascii_lowercase().as_str(),
                    "jpg" | "jpeg" | "png" | "bmp"
                )
            })
            .unwrap_or(false);
        if supported {
            images.push(path.to_path_buf());
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn parse_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["saliency-cli", "--input", "design.png"];
        argv.extend_from_slice(extra);
        AnalyzeArgs::parse_from(argv)
    }

    #[test]
    fn cli_overrides_replace_settings_values() {
        let mut settings = AppSettings::default();
        let args = parse_args(&[
            "--model",
            "custom.onnx",
            "--threshold",
            "0.7",
            "--max-points",
            "3",
            "--timeout-ms",
            "1500",
            "--width",
            "299",
            "--height",
            "299",
        ]);

        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.model.primary_path, PathBuf::from("custom.onnx"));
        assert_eq!(settings.analysis.activation_threshold, 0.7);
        assert_eq!(settings.analysis.max_attention_points, 3);
        assert_eq!(settings.analysis.inference_timeout_ms, Some(1500));
        assert_eq!(settings.input.width, 299);
        assert_eq!(settings.input.height, 299);
    }

    #[test]
    fn threshold_override_is_clamped() {
        let mut settings = AppSettings::default();
        let args = parse_args(&["--threshold", "4.2"]);

        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.analysis.activation_threshold, 1.0);
    }

    #[test]
    fn collect_images_filters_by_extension() {
        let dir = tempdir().expect("temp dir");
        for name in ["a.png", "b.jpg", "c.txt", "d.JPEG"] {
            fs::write(dir.path().join(name), b"stub").expect("write file");
        }

        let images = collect_images(dir.path()).expect("collect");
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.jpg", "d.JPEG"]);
    }

    #[test]
    fn write_overlay_round_trips_the_payload() {
        let dir = tempdir().expect("temp dir");
        let url = format!("data:image/png;base64,{}", BASE64.encode(b"fake png bytes"));

        let path = write_overlay(&url, Path::new("poster.png"), dir.path()).expect("write");

        assert_eq!(path.file_name().unwrap(), "poster_heatmap.png");
        assert_eq!(fs::read(path).unwrap(), b"fake png bytes");
    }

    #[test]
    fn write_overlay_rejects_non_data_uris() {
        let dir = tempdir().expect("temp dir");
        assert!(write_overlay("http://example/x.png", Path::new("a.png"), dir.path()).is_err());
    }
}
