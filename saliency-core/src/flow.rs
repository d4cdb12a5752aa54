//! Visual-flow classification and coarse region labeling for attention points.

use std::{cmp::Ordering, fmt};

use serde::{Serialize, Serializer};

use crate::attention::AttentionPoint;

/// Fixed pixel bands for region labels, tuned for the ~800x600 canvases the
/// product assumes. Intentionally not proportional to the image size.
const REGION_LOW_EDGE: u32 = 300;
const REGION_HIGH_EDGE: u32 = 600;

/// Coarse classification of how attention points are spatially ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualFlow {
    ZPattern,
    Vertical,
    Horizontal,
    Mixed,
}

impl VisualFlow {
    /// The user-facing description of the pattern.
    pub fn description(self) -> &'static str {
        match self {
            VisualFlow::ZPattern => "Z-pattern flow from top-left to bottom-right",
            VisualFlow::Vertical => "Vertical flow pattern",
            VisualFlow::Horizontal => "Horizontal flow pattern",
            VisualFlow::Mixed => "Mixed flow pattern with multiple focus points",
        }
    }
}

impl fmt::Display for VisualFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl Serialize for VisualFlow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.description())
    }
}

/// Classify the movement pattern of weighted attention points.
///
/// Points are ordered by descending weight before evaluation. Precedence is
/// deliberate: Z-pattern is the most restrictive shape and must win over a
/// sequence that also reads as vertical, so it is checked first, then
/// vertical, then horizontal. Fewer than two points satisfy every rule
/// vacuously and therefore classify as Z-pattern.
pub fn classify_flow(points: &[AttentionPoint]) -> VisualFlow {
    let mut ordered: Vec<&AttentionPoint> = points.iter().collect();
    ordered.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));

    if is_z_pattern(&ordered) {
        VisualFlow::ZPattern
    } else if is_vertical(&ordered) {
        VisualFlow::Vertical
    } else if is_horizontal(&ordered) {
        VisualFlow::Horizontal
    } else {
        VisualFlow::Mixed
    }
}

/// Point 2 sits below point 1, point 3 swings back left, and every later
/// point continues downward.
fn is_z_pattern(points: &[&AttentionPoint]) -> bool {
    points.iter().enumerate().skip(1).all(|(i, point)| {
        let prev = points[i - 1];
        if i == 2 {
            point.x < prev.x
        } else {
            point.y > prev.y
        }
    })
}

fn is_vertical(points: &[&AttentionPoint]) -> bool {
    points.windows(2).all(|pair| {
        let dx = (pair[1].x as i64 - pair[0].x as i64).abs();
        let dy = (pair[1].y as i64 - pair[0].y as i64).abs();
        dy > dx
    })
}

fn is_horizontal(points: &[&AttentionPoint]) -> bool {
    points.windows(2).all(|pair| {
        let dx = (pair[1].x as i64 - pair[0].x as i64).abs();
        let dy = (pair[1].y as i64 - pair[0].y as i64).abs();
        dx > dy
    })
}

/// Label each attention point with a coarse screen region.
///
/// Produces lines like `Area 1: top left (weight: 85.0%)`, strongest first.
pub fn dominant_areas(points: &[AttentionPoint]) -> Vec<String> {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let vertical = if point.y < REGION_LOW_EDGE {
                "top"
            } else if point.y > REGION_HIGH_EDGE {
                "bottom"
            } else {
                "middle"
            };
            let horizontal = if point.x < REGION_LOW_EDGE {
                "left"
            } else if point.x > REGION_HIGH_EDGE {
                "right"
            } else {
                "center"
            };
            format!(
                "Area {}: {} {} (weight: {:.1}%)",
                index + 1,
                vertical,
                horizontal,
                point.weight * 100.0
            )
        })
        .collect()
}
