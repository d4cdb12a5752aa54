//! Interpretation of raw network output as spatial attention values.

use crate::preprocess::InputSize;

/// A grid cell whose activation survived thresholding, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalientPoint {
    /// The x-coordinate in the original image.
    pub x: u32,
    /// The y-coordinate in the original image.
    pub y: u32,
    /// The raw activation value, nominally in [0, 1].
    pub value: f32,
}

/// Filter an activation grid and rescale surviving cells to source pixels.
///
/// The grid is read row-major at `grid_size` resolution. Cells whose value
/// exceeds `threshold` map to `(floor(x * scale_x), floor(y * scale_y))`.
/// A buffer shorter than the grid (the generic fallback model emits a logit
/// vector, not a saliency grid) reads as 0.0 past its end, so such models
/// simply contribute no points. Non-finite activations are skipped.
pub fn extract_salient_points(
    grid: &[f32],
    grid_size: InputSize,
    scale_x: f32,
    scale_y: f32,
    threshold: f32,
) -> Vec<SalientPoint> {
    let width = grid_size.width as usize;
    let height = grid_size.height as usize;

    let mut points = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let value = grid.get(y * width + x).copied().unwrap_or(0.0);
            if !value.is_finite() || value <= threshold {
                continue;
            }
            points.push(SalientPoint {
                x: (x as f32 * scale_x).floor() as u32,
                y: (y as f32 * scale_y).floor() as u32,
                value,
            });
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: InputSize = InputSize::new(224, 224);

    fn grid_with(cells: &[(usize, usize, f32)]) -> Vec<f32> {
        let mut grid = vec![0.0f32; 224 * 224];
        for &(x, y, value) in cells {
            grid[y * 224 + x] = value;
        }
        grid
    }

    #[test]
    fn rescales_grid_cells_to_source_pixels() {
        let grid = grid_with(&[(112, 112, 0.9)]);
        let points = extract_salient_points(&grid, GRID, 800.0 / 224.0, 600.0 / 224.0, 0.5);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].x, 400);
        assert_eq!(points[0].y, 300);
        assert_eq!(points[0].value, 0.9);
    }

    #[test]
    fn threshold_is_strict() {
        let grid = grid_with(&[(0, 0, 0.5), (1, 0, 0.51)]);
        let points = extract_salient_points(&grid, GRID, 1.0, 1.0, 0.5);

        assert_eq!(points.len(), 1);
        assert_eq!((points[0].x, points[0].y), (1, 0));
    }

    #[test]
    fn points_are_emitted_in_row_major_order() {
        let grid = grid_with(&[(5, 2, 0.8), (1, 2, 0.7), (3, 1, 0.6)]);
        let points = extract_salient_points(&grid, GRID, 1.0, 1.0, 0.5);

        let coords: Vec<(u32, u32)> = points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(coords, vec![(3, 1), (1, 2), (5, 2)]);
    }

    #[test]
    fn short_buffers_read_as_zero_past_the_end() {
        // A classifier-style output is far smaller than the grid.
        let logits = vec![0.99f32; 1_001];
        let points = extract_salient_points(&logits, GRID, 1.0, 1.0, 0.5);

        // Only the in-range prefix can contribute.
        assert!(points.iter().all(|p| (p.y as usize * 224 + p.x as usize) < logits.len()));
        assert_eq!(points.len(), logits.len());
    }

    #[test]
    fn non_finite_activations_are_skipped() {
        let grid = grid_with(&[(0, 0, f32::NAN), (1, 0, f32::INFINITY), (2, 0, 0.9)]);
        let points = extract_salient_points(&grid, GRID, 1.0, 1.0, 0.5);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].x, 2);
    }
}
