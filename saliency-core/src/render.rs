//! Density-overlay rendering behind a narrow surface capability.
//!
//! The rest of the pipeline only needs `set_data` + `data_url`, so that pair
//! is the whole boundary; any concrete density renderer can be adapted to it.
//! The default implementation splats radial kernels into an intensity buffer,
//! colorizes through a thermal ramp, and exports a PNG data URI.

use std::fmt;

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, codecs::png::PngEncoder};

use saliency_utils::config::RenderSettings;

use crate::saliency::SalientPoint;

/// Geometry and styling for one rendering surface.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// Surface width in pixels (matches the analyzed image).
    pub width: u32,
    /// Surface height in pixels (matches the analyzed image).
    pub height: u32,
    /// Splat radius in pixels.
    pub radius: u32,
    /// Opacity applied to the hottest cells.
    pub max_opacity: f32,
    /// Opacity applied to barely-warm cells.
    pub min_opacity: f32,
    /// Kernel softness in [0, 1].
    pub blur: f32,
}

impl SurfaceConfig {
    /// Build a surface config sized to an image, styled by settings.
    pub fn for_image(width: u32, height: u32, settings: &RenderSettings) -> Self {
        Self {
            width,
            height,
            radius: settings.radius,
            max_opacity: settings.max_opacity,
            min_opacity: settings.min_opacity,
            blur: settings.blur,
        }
    }
}

/// A drawing surface that accepts weighted points and exports an image reference.
pub trait HeatmapSurface {
    /// Feed every retained point, with `max_value` as the saturation ceiling.
    fn set_data(&mut self, points: &[SalientPoint], max_value: f32);
    /// Export the rendered overlay as a `data:` URI.
    fn data_url(&self) -> Result<String>;
}

/// Creates surfaces; injected into the analyzer so tests can substitute one.
pub trait SurfaceFactory: Send + Sync + fmt::Debug {
    fn create(&self, config: &SurfaceConfig) -> Result<Box<dyn HeatmapSurface>>;
}

/// Default factory producing [`GradientSurface`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct GradientSurfaceFactory;

impl SurfaceFactory for GradientSurfaceFactory {
    fn create(&self, config: &SurfaceConfig) -> Result<Box<dyn HeatmapSurface>> {
        anyhow::ensure!(
            config.width > 0 && config.height > 0,
            "surface dimensions must be greater than zero"
        );
        Ok(Box::new(GradientSurface::new(config.clone())))
    }
}

/// Raster density surface with a blue-green-yellow-red ramp.
pub struct GradientSurface {
    config: SurfaceConfig,
    intensity: Vec<f32>,
}

impl GradientSurface {
    fn new(config: SurfaceConfig) -> Self {
        let cells = config.width as usize * config.height as usize;
        Self {
            config,
            intensity: vec![0.0; cells],
        }
    }

    fn splat(&mut self, x: u32, y: u32, weight: f32) {
        let radius = self.config.radius.max(1) as i64;
        // Lower blur sharpens the kernel rim.
        let exponent = 1.0 + (1.0 - self.config.blur) * 2.0;
        let width = self.config.width as i64;
        let height = self.config.height as i64;
        let (cx, cy) = (x as i64, y as i64);

        for dy in -radius..=radius {
            let py = cy + dy;
            if py < 0 || py >= height {
                continue;
            }
            for dx in -radius..=radius {
                let px = cx + dx;
                if px < 0 || px >= width {
                    continue;
                }
                let distance = ((dx * dx + dy * dy) as f32).sqrt();
                if distance > radius as f32 {
                    continue;
                }
                let falloff = 1.0 - distance / radius as f32;
                let index = (py * width + px) as usize;
                self.intensity[index] += weight * falloff.powf(exponent);
            }
        }
    }

    fn render_rgba(&self) -> RgbaImage {
        let opacity_span = self.config.max_opacity - self.config.min_opacity;
        RgbaImage::from_fn(self.config.width, self.config.height, |x, y| {
            let index = (y * self.config.width + x) as usize;
            let value = self.intensity[index].clamp(0.0, 1.0);
            if value <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            let [r, g, b] = ramp_color(value);
            let alpha = (self.config.min_opacity + opacity_span * value).clamp(0.0, 1.0);
            Rgba([r, g, b, (alpha * 255.0).round() as u8])
        })
    }
}

impl HeatmapSurface for GradientSurface {
    fn set_data(&mut self, points: &[SalientPoint], max_value: f32) {
        self.intensity.fill(0.0);
        let ceiling = if max_value > 0.0 { max_value } else { 1.0 };
        for point in points {
            let weight = (point.value / ceiling).clamp(0.0, 1.0);
            self.splat(point.x, point.y, weight);
        }
    }

    fn data_url(&self) -> Result<String> {
        let overlay = self.render_rgba();
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                overlay.as_raw(),
                self.config.width,
                self.config.height,
                ExtendedColorType::Rgba8,
            )
            .context("failed to encode heatmap overlay")?;
        Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
    }
}

/// Classic thermal ramp: blue through green and yellow to red.
fn ramp_color(value: f32) -> [u8; 3] {
    const STOPS: [(f32, [u8; 3]); 4] = [
        (0.25, [0, 0, 255]),
        (0.55, [0, 255, 0]),
        (0.85, [255, 255, 0]),
        (1.0, [255, 0, 0]),
    ];

    let (mut prev_at, mut prev_color) = (0.0f32, STOPS[0].1);
    for &(at, color) in &STOPS {
        if value <= at {
            let span = at - prev_at;
            let t = if span > 0.0 { (value - prev_at) / span } else { 1.0 };
            return [
                lerp(prev_color[0], color[0], t),
                lerp(prev_color[1], color[1], t),
                lerp(prev_color[2], color[2], t),
            ];
        }
        prev_at = at;
        prev_color = color;
    }
    STOPS[STOPS.len() - 1].1
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}
