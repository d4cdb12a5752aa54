//! High-level analysis runner coupling the model, preprocessing, extraction,
//! rendering, and summarization stages.

use std::{
    sync::{Arc, mpsc},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use log::warn;
use serde::Serialize;
use tract_onnx::prelude::Tensor;

use saliency_utils::config::{AnalysisSettings, RenderSettings};
use saliency_utils::timing_guard;

use crate::attention::{AttentionPoint, find_attention_points};
use crate::flow::{VisualFlow, classify_flow, dominant_areas};
use crate::model::InferenceBackend;
use crate::preprocess::{PreprocessConfig, preprocess_dynamic_image};
use crate::provider::ModelProvider;
use crate::render::{GradientSurfaceFactory, SurfaceConfig, SurfaceFactory};
use crate::saliency::extract_salient_points;

/// Analysis parameters consumed by the analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Minimum activation value for a grid cell to be retained.
    pub activation_threshold: f32,
    /// Maximum number of attention points reported per analysis.
    pub max_attention_points: usize,
    /// Abandon inference after this deadline (unset = wait forever).
    pub inference_timeout: Option<Duration>,
    /// Styling for the rendered overlay.
    pub render: RenderSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_settings(&AnalysisSettings::default(), RenderSettings::default())
    }
}

impl AnalysisConfig {
    /// Combine persisted analysis and render settings.
    pub fn from_settings(analysis: &AnalysisSettings, render: RenderSettings) -> Self {
        Self {
            activation_threshold: analysis.activation_threshold,
            max_attention_points: analysis.max_attention_points,
            inference_timeout: analysis.inference_timeout_ms.map(Duration::from_millis),
            render,
        }
    }
}

/// Outcome of one heatmap analysis.
///
/// Created once per request and never mutated. A failed analysis carries an
/// empty URL, no points, and a human-readable `error` string.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapResult {
    /// Rendered overlay as a `data:image/png;base64,...` URI, or empty on failure.
    pub heatmap_url: String,
    /// Up to the configured maximum of points, strongest first.
    pub attention_points: Vec<AttentionPoint>,
    /// Populated when the analysis failed; the caller renders it as user-facing text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HeatmapResult {
    fn failure(message: String) -> Self {
        Self {
            heatmap_url: String::new(),
            attention_points: Vec::new(),
            error: Some(message),
        }
    }

    /// Returns `true` when the analysis failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Pixel dimensions of the analyzed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Full design analysis as the surrounding application consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct DesignAnalysis {
    /// Original image dimensions.
    pub image_size: ImageSize,
    /// Region label per attention point, strongest first.
    pub dominant_areas: Vec<String>,
    /// Movement-pattern classification of the attention points.
    pub visual_flow: VisualFlow,
    /// The underlying heatmap result.
    pub heatmap: HeatmapResult,
}

/// Couples a model provider with preprocessing, analysis, and rendering
/// settings. The main entry point for generating attention heatmaps.
#[derive(Debug)]
pub struct SaliencyAnalyzer {
    provider: Arc<ModelProvider>,
    preprocess: PreprocessConfig,
    analysis: AnalysisConfig,
    surfaces: Box<dyn SurfaceFactory>,
}

impl SaliencyAnalyzer {
    /// Construct an analyzer with the default gradient renderer.
    pub fn new(
        provider: Arc<ModelProvider>,
        preprocess: PreprocessConfig,
        analysis: AnalysisConfig,
    ) -> Self {
        Self {
            provider,
            preprocess,
            analysis,
            surfaces: Box::new(GradientSurfaceFactory),
        }
    }

    /// Substitute the rendering backend.
    pub fn with_surface_factory(mut self, surfaces: Box<dyn SurfaceFactory>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Access the shared model provider.
    pub fn provider(&self) -> &ModelProvider {
        &self.provider
    }

    /// Generate a heatmap for an in-memory image.
    ///
    /// This never fails outward: initialization and pipeline errors both
    /// resolve to a [`HeatmapResult`] carrying an error string, and
    /// intermediate buffers are dropped on every path.
    pub fn generate_heatmap(&self, image: &DynamicImage) -> HeatmapResult {
        let _guard = timing_guard("saliency_core::generate_heatmap", log::Level::Debug);

        let backend = match self.provider.initialize() {
            Ok(backend) => backend,
            Err(err) => {
                warn!("heatmap model initialization failed: {err:#}");
                return HeatmapResult::failure(format!(
                    "failed to initialize heatmap model: {err:#}"
                ));
            }
        };

        match self.run_pipeline(backend, image) {
            Ok(result) => result,
            Err(err) => {
                warn!("heatmap generation failed: {err:#}");
                HeatmapResult::failure(format!("failed to generate heatmap: {err:#}"))
            }
        }
    }

    /// Generate a heatmap plus the flow/region analysis built on top of it.
    pub fn analyze(&self, image: &DynamicImage) -> DesignAnalysis {
        let (width, height) = image.dimensions();
        let heatmap = self.generate_heatmap(image);
        DesignAnalysis {
            image_size: ImageSize { width, height },
            dominant_areas: dominant_areas(&heatmap.attention_points),
            visual_flow: classify_flow(&heatmap.attention_points),
            heatmap,
        }
    }

    fn run_pipeline(
        &self,
        backend: Arc<dyn InferenceBackend>,
        image: &DynamicImage,
    ) -> Result<HeatmapResult> {
        let prep = preprocess_dynamic_image(image, &self.preprocess)?;
        let (orig_w, orig_h) = prep.original_size;
        let (scale_x, scale_y) = (prep.scale_x, prep.scale_y);

        let grid = self.run_inference(backend, prep.tensor)?;
        let points = extract_salient_points(
            &grid,
            self.preprocess.input_size,
            scale_x,
            scale_y,
            self.analysis.activation_threshold,
        );

        let heatmap_url = {
            let _guard = timing_guard("saliency_core::render", log::Level::Debug);
            let surface_config = SurfaceConfig::for_image(orig_w, orig_h, &self.analysis.render);
            let mut surface = self.surfaces.create(&surface_config)?;
            // Activations are interpreted against a fixed [0, 1] scale.
            surface.set_data(&points, 1.0);
            surface.data_url()?
        };

        let attention_points = find_attention_points(&points, self.analysis.max_attention_points);

        Ok(HeatmapResult {
            heatmap_url,
            attention_points,
            error: None,
        })
    }

    fn run_inference(&self, backend: Arc<dyn InferenceBackend>, tensor: Tensor) -> Result<Vec<f32>> {
        let _guard = timing_guard("saliency_core::inference", log::Level::Debug);
        match self.analysis.inference_timeout {
            None => backend.infer(&tensor),
            Some(deadline) => {
                let (sender, receiver) = mpsc::channel();
                thread::Builder::new()
                    .name("saliency-infer".into())
                    .spawn(move || {
                        let _ = sender.send(backend.infer(&tensor));
                    })
                    .context("failed to spawn inference worker")?;

                match receiver.recv_timeout(deadline) {
                    Ok(outcome) => outcome,
                    // The worker has no cancellation hook; it is abandoned
                    // and its result dropped with the channel.
                    Err(mpsc::RecvTimeoutError::Timeout) => anyhow::bail!(
                        "inference exceeded the {:?} deadline",
                        deadline
                    ),
                    Err(mpsc::RecvTimeoutError::Disconnected) => {
                        anyhow::bail!("inference worker exited without producing output")
                    }
                }
            }
        }
    }
}
