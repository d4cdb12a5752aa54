use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Result, anyhow};
use image::{DynamicImage, Rgb, RgbImage};
use tract_onnx::prelude::Tensor;

use saliency_core::{
    AnalysisConfig, InferenceBackend, ModelProvider, PreprocessConfig, SaliencyAnalyzer,
    VisualFlow,
};

const GRID_WIDTH: usize = 224;

#[derive(Debug)]
struct GridBackend {
    grid: Vec<f32>,
}

impl GridBackend {
    fn with_cells(cells: &[(usize, usize, f32)]) -> Self {
        let mut grid = vec![0.0f32; GRID_WIDTH * GRID_WIDTH];
        for &(x, y, value) in cells {
            grid[y * GRID_WIDTH + x] = value;
        }
        Self { grid }
    }
}

impl InferenceBackend for GridBackend {
    fn infer(&self, _input: &Tensor) -> Result<Vec<f32>> {
        Ok(self.grid.clone())
    }
}

#[derive(Debug)]
struct FailingBackend;

impl InferenceBackend for FailingBackend {
    fn infer(&self, _input: &Tensor) -> Result<Vec<f32>> {
        Err(anyhow!("backend exploded"))
    }
}

#[derive(Debug)]
struct StallingBackend {
    delay: Duration,
}

impl InferenceBackend for StallingBackend {
    fn infer(&self, _input: &Tensor) -> Result<Vec<f32>> {
        thread::sleep(self.delay);
        Ok(vec![0.0; GRID_WIDTH * GRID_WIDTH])
    }
}

fn analyzer_for(backend: Arc<dyn InferenceBackend>) -> SaliencyAnalyzer {
    SaliencyAnalyzer::new(
        Arc::new(ModelProvider::for_backend(backend)),
        PreprocessConfig::default(),
        AnalysisConfig::default(),
    )
}

fn test_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 251) as u8, 128])
    }))
}

#[test]
fn single_activation_rescales_to_source_coordinates() {
    let backend = Arc::new(GridBackend::with_cells(&[(112, 112, 0.9)]));
    let analyzer = analyzer_for(backend);

    let result = analyzer.generate_heatmap(&test_image(800, 600));

    assert!(result.error.is_none(), "unexpected error: {:?}", result.error);
    assert!(result.heatmap_url.starts_with("data:image/png;base64,"));
    assert_eq!(result.attention_points.len(), 1);
    assert_eq!(result.attention_points[0].x, 400);
    assert_eq!(result.attention_points[0].y, 300);
    assert_eq!(result.attention_points[0].weight, 0.9);
}

#[test]
fn attention_points_are_capped_and_ordered() {
    let cells: Vec<(usize, usize, f32)> = (0..10)
        .map(|i| (i * 3, i * 2, 0.52 + i as f32 * 0.04))
        .collect();
    let analyzer = analyzer_for(Arc::new(GridBackend::with_cells(&cells)));

    let result = analyzer.generate_heatmap(&test_image(224, 224));

    assert!(result.error.is_none());
    assert_eq!(result.attention_points.len(), 5);
    assert!(
        result
            .attention_points
            .windows(2)
            .all(|pair| pair[0].weight >= pair[1].weight)
    );
    for point in &result.attention_points {
        assert!((0.0..=1.0).contains(&point.weight));
        let scaled = point.weight * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-3, "weight not rounded: {}", point.weight);
    }
}

#[test]
fn model_loads_once_across_analyses() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let provider = Arc::new(ModelProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(GridBackend::with_cells(&[(10, 10, 0.8)])) as Arc<dyn InferenceBackend>)
    }));
    let analyzer = SaliencyAnalyzer::new(
        provider,
        PreprocessConfig::default(),
        AnalysisConfig::default(),
    );

    let image = test_image(400, 400);
    analyzer.generate_heatmap(&image);
    analyzer.generate_heatmap(&image);

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn failed_initialization_resolves_to_error_result() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = loads.clone();
    let provider = Arc::new(ModelProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("neither model could be loaded"))
    }));
    let analyzer = SaliencyAnalyzer::new(
        provider,
        PreprocessConfig::default(),
        AnalysisConfig::default(),
    );

    let image = test_image(400, 400);
    let first = analyzer.generate_heatmap(&image);
    let second = analyzer.generate_heatmap(&image);

    for result in [&first, &second] {
        assert_eq!(result.heatmap_url, "");
        assert!(result.attention_points.is_empty());
        let message = result.error.as_deref().expect("error string");
        assert!(!message.is_empty());
        assert!(message.contains("initialize"), "{message}");
    }
    // The failed load is cached, never retried.
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_inference_resolves_to_error_result() {
    let analyzer = analyzer_for(Arc::new(FailingBackend));

    let result = analyzer.generate_heatmap(&test_image(300, 300));

    assert_eq!(result.heatmap_url, "");
    assert!(result.attention_points.is_empty());
    let message = result.error.as_deref().expect("error string");
    assert!(message.contains("generate"), "{message}");
}

#[test]
fn stalled_inference_times_out_into_error_result() {
    let provider = Arc::new(ModelProvider::for_backend(Arc::new(StallingBackend {
        delay: Duration::from_secs(5),
    })));
    let mut analysis = AnalysisConfig::default();
    analysis.inference_timeout = Some(Duration::from_millis(50));
    let analyzer = SaliencyAnalyzer::new(provider, PreprocessConfig::default(), analysis);

    let result = analyzer.generate_heatmap(&test_image(200, 200));

    assert_eq!(result.heatmap_url, "");
    assert!(result.attention_points.is_empty());
    let message = result.error.as_deref().expect("error string");
    assert!(message.contains("deadline"), "{message}");
}

#[test]
fn empty_grid_produces_no_points_but_still_renders() {
    let analyzer = analyzer_for(Arc::new(GridBackend::with_cells(&[])));

    let result = analyzer.generate_heatmap(&test_image(320, 240));

    assert!(result.error.is_none());
    assert!(result.attention_points.is_empty());
    assert!(result.heatmap_url.starts_with("data:image/png;base64,"));
}

#[test]
fn analyze_reports_flow_and_regions() {
    // Three activations stacked almost vertically, strongest at the top.
    let backend = Arc::new(GridBackend::with_cells(&[
        (10, 10, 0.9),
        (11, 60, 0.8),
        (12, 110, 0.7),
    ]));
    let analyzer = analyzer_for(backend);

    let analysis = analyzer.analyze(&test_image(224, 224));

    assert_eq!(analysis.image_size.width, 224);
    assert_eq!(analysis.image_size.height, 224);
    assert_eq!(analysis.visual_flow, VisualFlow::Vertical);
    assert_eq!(analysis.dominant_areas.len(), 3);
    assert_eq!(analysis.dominant_areas[0], "Area 1: top left (weight: 90.0%)");
    assert!(analysis.heatmap.error.is_none());
}
