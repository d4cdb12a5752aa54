//! Image annotation functionality for marking attention points.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use image::{DynamicImage, Rgba};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use saliency_core::AttentionPoint;

/// Draw attention markers on an image and save it to a directory.
///
/// Marker radius scales with the point's weight so the strongest areas read
/// at a glance.
pub fn annotate_image(
    image: &DynamicImage,
    source_name: &Path,
    points: &[AttentionPoint],
    output_dir: &Path,
) -> Result<std::path::PathBuf> {
    let mut canvas = image.to_rgba8();
    let (img_w, img_h) = canvas.dimensions();

    if img_w == 0 || img_h == 0 {
        anyhow::bail!(
            "cannot annotate image with zero dimensions: {}",
            source_name.display()
        );
    }

    let marker_color = Rgba([255, 0, 0, 255]);
    let ring_color = Rgba([255, 255, 255, 255]);

    for point in points {
        let cx = clamp_to_i32(point.x, img_w);
        let cy = clamp_to_i32(point.y, img_h);
        let radius = marker_radius(point.weight);
        draw_filled_circle_mut(&mut canvas, (cx, cy), radius, marker_color);
        draw_hollow_circle_mut(&mut canvas, (cx, cy), radius + 2, ring_color);
    }

    let file_name = source_name
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("frame.png"));
    let output_path = output_dir.join(file_name);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    canvas
        .save(&output_path)
        .with_context(|| format!("failed to save annotated image {}", output_path.display()))?;

    Ok(output_path)
}

/// Marker radius in pixels for a weight in [0, 1].
fn marker_radius(weight: f32) -> i32 {
    4 + (weight.clamp(0.0, 1.0) * 8.0).round() as i32
}

/// Clamp a pixel coordinate to a valid integer index.
#[inline]
fn clamp_to_i32(value: u32, max_extent: u32) -> i32 {
    if max_extent == 0 {
        return 0;
    }
    value.min(max_extent - 1) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use tempfile::tempdir;

    #[test]
    fn marker_radius_tracks_weight() {
        assert_eq!(marker_radius(0.0), 4);
        assert_eq!(marker_radius(1.0), 12);
        assert_eq!(marker_radius(5.0), 12);
    }

    #[test]
    fn writes_annotated_copy_named_after_source() {
        let dir = tempdir().expect("temp dir");
        let image = DynamicImage::ImageRgb8(RgbImage::new(64, 64));
        let points = vec![AttentionPoint {
            x: 32,
            y: 32,
            weight: 0.8,
        }];

        let output = annotate_image(&image, Path::new("design.png"), &points, dir.path())
            .expect("annotate");

        assert_eq!(output.file_name().unwrap(), "design.png");
        assert!(output.exists());
    }

    #[test]
    fn out_of_bounds_points_are_clamped() {
        let dir = tempdir().expect("temp dir");
        let image = DynamicImage::ImageRgb8(RgbImage::new(32, 32));
        let points = vec![AttentionPoint {
            x: 500,
            y: 500,
            weight: 1.0,
        }];

        annotate_image(&image, Path::new("edge.png"), &points, dir.path())
            .expect("annotate should clamp");
    }
}
