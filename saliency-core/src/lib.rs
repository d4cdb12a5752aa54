//! Core attention-heatmap inference primitives.
//!
//! This crate loads a saliency ONNX model (with a generic-classifier
//! fallback), runs inference with `tract-onnx`, and turns the resulting
//! activation grid into a rendered density overlay, ranked attention points,
//! and a visual-flow classification.

/// High-level analysis runner and result types.
pub mod analyzer;
/// Attention-point ranking and summarization.
pub mod attention;
/// Visual-flow classification and coarse region labeling.
pub mod flow;
/// ONNX model loading and execution.
pub mod model;
/// Image pre-processing (resizing, tensor conversion).
pub mod preprocess;
/// Lazily-initialized model ownership with fallback loading.
pub mod provider;
/// Density-overlay rendering behind a narrow surface capability.
pub mod render;
/// Activation-grid filtering and rescaling.
pub mod saliency;

pub use analyzer::{AnalysisConfig, DesignAnalysis, HeatmapResult, ImageSize, SaliencyAnalyzer};
pub use attention::{AttentionPoint, find_attention_points};
pub use flow::{VisualFlow, classify_flow, dominant_areas};
pub use model::{InferenceBackend, SaliencyModel};
pub use preprocess::{
    InputSize, PreprocessConfig, PreprocessOutput, preprocess_dynamic_image, preprocess_image,
};
pub use provider::ModelProvider;
pub use render::{
    GradientSurfaceFactory, HeatmapSurface, SurfaceConfig, SurfaceFactory,
};
pub use saliency::{SalientPoint, extract_salient_points};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
