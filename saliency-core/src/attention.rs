//! Ranking retained activations into a short list of attention points.

use std::cmp::Ordering;

use serde::Serialize;

use crate::saliency::SalientPoint;

/// A locally high attention score at a source-image coordinate.
///
/// Immutable once produced; `weight` is rounded to three decimal places and
/// lies in [0, 1] for well-formed activations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttentionPoint {
    /// The x-coordinate in the original image.
    pub x: u32,
    /// The y-coordinate in the original image.
    pub y: u32,
    /// The rounded activation weight.
    pub weight: f32,
}

/// Rank retained points by value and keep the strongest few.
///
/// The sort is stable, so equal values keep their encounter order. Weights
/// are rounded to exactly three decimal places.
pub fn find_attention_points(points: &[SalientPoint], max_points: usize) -> Vec<AttentionPoint> {
    let mut ranked: Vec<&SalientPoint> = points.iter().collect();
    ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    ranked.truncate(max_points);

    ranked
        .into_iter()
        .map(|point| AttentionPoint {
            x: point.x,
            y: point.y,
            weight: round_weight(point.value),
        })
        .collect()
}

fn round_weight(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
