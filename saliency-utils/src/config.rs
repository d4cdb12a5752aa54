//! Shared configuration types consumed across the saliency workspace.
//!
//! These structures provide a common representation for model, preprocessing,
//! analysis, and rendering settings that can be serialized to disk and reused
//! by any front-end driving the pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Filter preference controlling the quality vs speed trade-off when resizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeQuality {
    /// Bilinear resampling (default, Triangle filter).
    #[default]
    Quality,
    /// Prioritize throughput for batch analysis (Nearest filter).
    Speed,
}

impl fmt::Display for ResizeQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ResizeQuality::Quality => "quality",
                ResizeQuality::Speed => "speed",
            }
        )
    }
}

impl FromStr for ResizeQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(ResizeQuality::Quality),
            "speed" => Ok(ResizeQuality::Speed),
            other => Err(format!(
                "invalid resize quality '{other}'; expected 'quality' or 'speed'"
            )),
        }
    }
}

/// Locations of the serialized network graphs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the saliency model tried first.
    pub primary_path: PathBuf,
    /// Generic classifier model loaded when the primary model is unavailable.
    pub fallback_path: Option<PathBuf>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            primary_path: PathBuf::from("models/saliency_224.onnx"),
            fallback_path: Some(PathBuf::from("models/mobilenet_v1_224.onnx")),
        }
    }
}

/// Network input resolution in pixels (width x height).
///
/// The input image is resized to these dimensions before inference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    /// Choose between quality-focused or speed-focused resizing.
    pub resize_quality: ResizeQuality,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            resize_quality: ResizeQuality::Quality,
        }
    }
}

/// Parameters controlling how raw activations are filtered and summarized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Minimum activation value for a grid cell to be retained.
    pub activation_threshold: f32,
    /// Maximum number of attention points reported per analysis.
    pub max_attention_points: usize,
    /// Abort inference after this many milliseconds (unset = wait forever).
    pub inference_timeout_ms: Option<u64>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            activation_threshold: 0.5,
            max_attention_points: 5,
            inference_timeout_ms: None,
        }
    }
}

impl AnalysisSettings {
    /// Clamp values to sensible ranges.
    pub fn clamp(&mut self) {
        self.activation_threshold = self.activation_threshold.clamp(0.0, 1.0);
        if self.max_attention_points == 0 {
            self.max_attention_points = AnalysisSettings::default().max_attention_points;
        }
    }
}

/// Options for the density overlay renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Splat radius in pixels for each retained point.
    pub radius: u32,
    /// Opacity applied to the hottest cells.
    pub max_opacity: f32,
    /// Opacity applied to barely-warm cells.
    pub min_opacity: f32,
    /// Kernel softness in [0, 1]; higher values bleed further from the center.
    pub blur: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            radius: 30,
            max_opacity: 0.6,
            min_opacity: 0.0,
            blur: 0.8,
        }
    }
}

impl RenderSettings {
    /// Clamp values to sensible ranges.
    pub fn clamp(&mut self) {
        self.max_opacity = self.max_opacity.clamp(0.0, 1.0);
        self.min_opacity = self.min_opacity.clamp(0.0, self.max_opacity);
        self.blur = self.blur.clamp(0.0, 1.0);
        if self.radius == 0 {
            self.radius = 1;
        }
    }
}

/// Top-level settings aggregate persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    pub model: ModelSettings,
    pub input: InputDimensions,
    pub analysis: AnalysisSettings,
    pub render: RenderSettings,
}

impl AppSettings {
    /// Load settings from a JSON file, clamping out-of-range values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        settings.analysis.clamp();
        settings.render.clamp();
        Ok(settings)
    }

    /// Persist settings as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write settings file {}", path.display()))
    }
}
