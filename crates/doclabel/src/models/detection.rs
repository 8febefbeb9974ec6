//! OCR detections as produced by a recognizer backend.

use serde::{Deserialize, Serialize};

/// A point in pixel space (origin top-left, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Quadrilateral detection region.
///
/// Corner order is top-left, top-right, bottom-right, bottom-left in the
/// text's reading orientation. The quad is not necessarily axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self(points)
    }

    /// Axis-aligned quad spanning `(left, top)` to `(right, bottom)`.
    pub fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    /// Build a quad from `[x, y]` pairs, the shape most engines report.
    pub fn from_pairs(pairs: [[f64; 2]; 4]) -> Self {
        Self(pairs.map(|[x, y]| Point::new(x, y)))
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Point::is_finite)
    }

    /// Enclosed area by the shoelace formula; unsigned.
    pub fn area(&self) -> f64 {
        let p = &self.0;
        let twice: f64 = (0..4)
            .map(|i| {
                let (a, b) = (p[i], p[(i + 1) % 4]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() / 2.0
    }
}

/// One recognized text region on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub quad: Quad,
    /// Recognized text. Empty when the region was detected but not read.
    pub text: String,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Detection {
    /// Create a detection. Confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
