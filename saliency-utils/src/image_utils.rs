use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage, imageops::FilterType};
use ndarray::Array3;

/// Load an image from disk into memory.
///
/// # Arguments
///
/// * `path` - The path to the image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Resize an image to the requested resolution using the provided filter.
///
/// # Arguments
///
/// * `image` - The image to resize.
/// * `width` - The target width.
/// * `height` - The target height.
/// * `filter` - The sampling filter to use for resizing.
pub fn resize_image(image: &DynamicImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    image.resize_exact(width, height, filter).to_rgb8()
}

/// Convert an RGB image into an HWC array with channel values scaled into [0, 1].
///
/// The memory layout stays HWC (height, width, channels) and channel order
/// stays RGB; each `u8` sample is divided by 255.
///
/// # Arguments
///
/// * `image` - The RGB image to convert.
pub fn rgb_to_hwc_normalized(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut array = Array3::<f32>::zeros((height as usize, width as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(yi, xi, 0)] = pixel[0] as f32 / 255.0;
        array[(yi, xi, 1)] = pixel[1] as f32 / 255.0;
        array[(yi, xi, 2)] = pixel[2] as f32 / 255.0;
    }
    array
}

/// Compute scale factors used to reproject grid cells from model space to original space.
///
/// This is necessary because the model runs on a resized version of the original image.
///
/// # Arguments
///
/// * `original` - A tuple of the original image's (width, height).
/// * `target` - A tuple of the resized image's (width, height).
pub fn compute_resize_scales(original: (u32, u32), target: (u32, u32)) -> Result<(f32, f32)> {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;
    anyhow::ensure!(
        target_w > 0 && target_h > 0,
        "target dimensions must be non-zero"
    );
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "original dimensions must be non-zero"
    );
    Ok((
        orig_w as f32 / target_w as f32,
        orig_h as f32 / target_h as f32,
    ))
}
