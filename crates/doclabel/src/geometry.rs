//! Pixel-space quads to percentage-space annotation geometry.
//!
//! The annotation tool positions every shape in percent of the image
//! dimensions so it can render on any scale. Rotated rectangles follow the
//! tool's convention: `(x, y)` is the first corner, `width`/`height` are the
//! edge lengths, and `rotation` turns the shape clockwise around that corner.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Point, Quad};

/// Angles closer than this to horizontal are treated as axis-aligned.
pub const DEFAULT_ROTATION_TOLERANCE_DEG: f64 = 1.0;

/// A quad enclosing less than this fraction of its bounding box is degenerate.
const MIN_AREA_RATIO: f64 = 1e-6;

/// Errors from geometry normalization.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Quad has a non-finite coordinate")]
    NonFinite,

    #[error("Degenerate quad ({width:.2}x{height:.2} px)")]
    Degenerate { width: f64, height: f64 },

    #[error("Image has a zero dimension ({width}x{height})")]
    ZeroImage { width: u32, height: u32 },
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PixelRect {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Intersect with the image rectangle `[0, width] x [0, height]`.
    pub fn clip_to(&self, width: f64, height: f64) -> Self {
        Self {
            left: self.left.clamp(0.0, width),
            top: self.top.clamp(0.0, height),
            right: self.right.clamp(0.0, width),
            bottom: self.bottom.clamp(0.0, height),
        }
    }
}

/// Minimal axis-aligned bounding box of a quad.
///
/// Fails for quads that enclose no area, including ones whose corners are
/// collinear along a diagonal.
pub fn bounding_box(quad: &Quad) -> Result<PixelRect, GeometryError> {
    if !quad.is_finite() {
        return Err(GeometryError::NonFinite);
    }

    let points = quad.points();
    let mut rect = PixelRect {
        left: points[0].x,
        top: points[0].y,
        right: points[0].x,
        bottom: points[0].y,
    };
    for p in &points[1..] {
        rect.left = rect.left.min(p.x);
        rect.top = rect.top.min(p.y);
        rect.right = rect.right.max(p.x);
        rect.bottom = rect.bottom.max(p.y);
    }

    let flat = rect.width() <= 0.0 || rect.height() <= 0.0;
    if flat || quad.area() < MIN_AREA_RATIO * rect.width() * rect.height() {
        return Err(GeometryError::Degenerate {
            width: rect.width(),
            height: rect.height(),
        });
    }
    Ok(rect)
}

/// Angle of the top edge against the horizontal, clockwise degrees in `[0, 360)`.
pub fn top_edge_angle(quad: &Quad) -> f64 {
    let (p0, p1) = (quad.top_left(), quad.top_right());
    let angle = (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees();
    normalize_angle(angle)
}

/// Rotation for a quad, or 0 when it is within `tolerance_deg` of axis-aligned.
pub fn rotation(quad: &Quad, tolerance_deg: f64) -> f64 {
    let angle = top_edge_angle(quad);
    let deviation = angle.min(360.0 - angle);
    if deviation < tolerance_deg {
        0.0
    } else {
        angle
    }
}

fn normalize_angle(degrees: f64) -> f64 {
    let a = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Shape geometry in percent of image width (`x`, `width`) and height (`y`, `height`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl NormalizedBox {
    /// Clamp every coordinate into `[0, 100]`.
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_pct(self.x),
            y: clamp_pct(self.y),
            width: clamp_pct(self.width),
            height: clamp_pct(self.height),
            rotation: self.rotation,
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=100.0).contains(v))
    }

    /// Map back to a pixel-space quad on an image of the given size.
    pub fn to_quad(&self, image_width: u32, image_height: u32) -> Quad {
        let (w, h) = (image_width as f64, image_height as f64);
        let origin = Point::new(self.x * w / 100.0, self.y * h / 100.0);
        let edge_w = self.width * w / 100.0;
        let edge_h = self.height * h / 100.0;
        let theta = self.rotation.to_radians();
        let (sin, cos) = theta.sin_cos();

        let top_right = Point::new(origin.x + edge_w * cos, origin.y + edge_w * sin);
        let bottom_left = Point::new(origin.x - edge_h * sin, origin.y + edge_h * cos);
        let bottom_right = Point::new(
            top_right.x + (bottom_left.x - origin.x),
            top_right.y + (bottom_left.y - origin.y),
        );
        Quad::new([origin, top_right, bottom_right, bottom_left])
    }
}

fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Normalize a pixel-space quad into clamped percentage geometry.
pub fn normalize(
    quad: &Quad,
    image_width: u32,
    image_height: u32,
    tolerance_deg: f64,
) -> Result<NormalizedBox, GeometryError> {
    if image_width == 0 || image_height == 0 {
        return Err(GeometryError::ZeroImage {
            width: image_width,
            height: image_height,
        });
    }

    let bbox = bounding_box(quad)?;
    let (w, h) = (image_width as f64, image_height as f64);
    let rotation = rotation(quad, tolerance_deg);

    let raw = if rotation == 0.0 {
        let clipped = bbox.clip_to(w, h);
        NormalizedBox {
            x: 100.0 * clipped.left / w,
            y: 100.0 * clipped.top / h,
            width: 100.0 * clipped.width() / w,
            height: 100.0 * clipped.height() / h,
            rotation,
        }
    } else {
        let origin = quad.top_left();
        let edge_w = origin.distance(&quad.top_right());
        let edge_h = origin.distance(&quad.bottom_left());
        if edge_w <= 0.0 || edge_h <= 0.0 {
            return Err(GeometryError::Degenerate {
                width: edge_w,
                height: edge_h,
            });
        }
        NormalizedBox {
            x: 100.0 * origin.x / w,
            y: 100.0 * origin.y / h,
            width: 100.0 * edge_w / w,
            height: 100.0 * edge_h / h,
            rotation,
        }
    };

    Ok(raw.clamped())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotated_quad(origin: Point, w: f64, h: f64, degrees: f64) -> Quad {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let p1 = Point::new(origin.x + w * cos, origin.y + w * sin);
        let p3 = Point::new(origin.x - h * sin, origin.y + h * cos);
        let p2 = Point::new(p1.x + p3.x - origin.x, p1.y + p3.y - origin.y);
        Quad::new([origin, p1, p2, p3])
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_axis_aligned_box() {
        let quad = Quad::from_rect(100.0, 200.0, 300.0, 400.0);
        let b = normalize(&quad, 1000, 2000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        assert_close(b.x, 10.0);
        assert_close(b.y, 10.0);
        assert_close(b.width, 20.0);
        assert_close(b.height, 10.0);
        assert_eq!(b.rotation, 0.0);
    }

    #[test]
    fn test_rotated_fifteen_degrees() {
        let quad = rotated_quad(Point::new(100.0, 100.0), 300.0, 40.0, 15.0);
        let b = normalize(&quad, 1000, 1000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        assert!((b.rotation - 15.0).abs() < 0.01, "rotation {}", b.rotation);
        assert_close(b.x, 10.0);
        assert_close(b.width, 30.0);
        assert_close(b.height, 4.0);
    }

    #[test]
    fn test_counter_clockwise_rotation_wraps() {
        let quad = rotated_quad(Point::new(100.0, 500.0), 300.0, 40.0, -20.0);
        let angle = top_edge_angle(&quad);
        assert!((angle - 340.0).abs() < 0.01, "angle {angle}");
    }

    #[test]
    fn test_small_skew_is_axis_aligned() {
        // 1px rise over 200px is ~0.29 degrees
        let quad = Quad::from_pairs([[10.0, 10.0], [210.0, 11.0], [210.0, 41.0], [10.0, 40.0]]);
        assert_eq!(rotation(&quad, DEFAULT_ROTATION_TOLERANCE_DEG), 0.0);
        let b = normalize(&quad, 1000, 1000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        assert_close(b.y, 1.0);
        assert_close(b.height, 3.1);
    }

    #[test]
    fn test_overshoot_is_clipped() {
        let quad = Quad::from_rect(-5.0, 950.0, 120.0, 1010.0);
        let b = normalize(&quad, 100, 1000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        assert!(b.is_within_bounds());
        assert_close(b.x, 0.0);
        assert_close(b.width, 100.0);
        assert_close(b.y + b.height, 100.0);
    }

    #[test]
    fn test_rotated_values_are_clamped() {
        let quad = rotated_quad(Point::new(-50.0, 10.0), 5000.0, 40.0, 30.0);
        let b = normalize(&quad, 1000, 1000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        assert!(b.is_within_bounds());
        assert_eq!(b.x, 0.0);
        assert_eq!(b.width, 100.0);
    }

    #[test]
    fn test_zero_image_dimension() {
        let quad = Quad::from_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            normalize(&quad, 0, 100, 1.0),
            Err(GeometryError::ZeroImage {
                width: 0,
                height: 100
            })
        );
    }

    #[test]
    fn test_degenerate_quad() {
        let flat = Quad::from_rect(10.0, 10.0, 50.0, 10.0);
        assert!(matches!(
            normalize(&flat, 100, 100, 1.0),
            Err(GeometryError::Degenerate { .. })
        ));

        let nan = Quad::from_rect(f64::NAN, 0.0, 10.0, 10.0);
        assert_eq!(normalize(&nan, 100, 100, 1.0), Err(GeometryError::NonFinite));
    }

    #[test]
    fn test_collinear_diagonal_quad_is_degenerate() {
        let quad = Quad::from_pairs([[0.0, 0.0], [100.0, 100.0], [110.0, 110.0], [10.0, 10.0]]);
        assert_eq!(quad.area(), 0.0);
        assert!(matches!(
            normalize(&quad, 1000, 1000, DEFAULT_ROTATION_TOLERANCE_DEG),
            Err(GeometryError::Degenerate { .. })
        ));

        let thin = rotated_quad(Point::new(100.0, 100.0), 300.0, 1.0, 45.0);
        assert!(normalize(&thin, 1000, 1000, DEFAULT_ROTATION_TOLERANCE_DEG).is_ok());
    }

    #[test]
    fn test_to_quad_inverts_normalize() {
        let original = rotated_quad(Point::new(200.0, 300.0), 250.0, 60.0, 15.0);
        let b = normalize(&original, 1000, 2000, DEFAULT_ROTATION_TOLERANCE_DEG).unwrap();
        let rebuilt = b.to_quad(1000, 2000);
        for (a, r) in original.points().iter().zip(rebuilt.points()) {
            assert!(a.distance(r) < 1e-6, "{a:?} vs {r:?}");
        }
    }
}
