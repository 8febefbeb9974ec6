//! Corner ordering for engine-reported boxes.

use doclabel::models::{Point, Quad};

/// Order four corners as top-left, top-right, bottom-right, bottom-left.
///
/// Corners are walked clockwise around their centroid and the walk starts
/// at the corner whose outgoing edge points closest to +x. Boxes rotated
/// beyond 45 degrees are therefore read as if their nearest-to-horizontal
/// edge were the top.
pub fn order_corners(corners: [Point; 4]) -> Quad {
    let cx = corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = corners.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mut sorted = corners;
    // increasing atan2 with y down is clockwise on screen
    sorted.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb)
    });

    let start = (0..4)
        .min_by(|&i, &j| {
            edge_deviation(&sorted[i], &sorted[(i + 1) % 4])
                .total_cmp(&edge_deviation(&sorted[j], &sorted[(j + 1) % 4]))
        })
        .unwrap_or(0);

    Quad::new([
        sorted[start],
        sorted[(start + 1) % 4],
        sorted[(start + 2) % 4],
        sorted[(start + 3) % 4],
    ])
}

/// Absolute angle between the edge `a -> b` and the +x axis, in radians.
fn edge_deviation(a: &Point, b: &Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_aligned_any_input_order() {
        let expected = Quad::from_rect(10.0, 20.0, 110.0, 50.0);
        let [tl, tr, br, bl] = *expected.points();
        for input in [[br, tl, bl, tr], [bl, br, tr, tl], [tl, tr, br, bl]] {
            assert_eq!(order_corners(input), expected);
        }
    }

    #[test]
    fn test_rotated_box_starts_at_top_left() {
        // 10 degree clockwise tilt around (0, 0)
        let (sin, cos) = 10f64.to_radians().sin_cos();
        let tl = Point::new(0.0, 0.0);
        let tr = Point::new(100.0 * cos, 100.0 * sin);
        let bl = Point::new(-20.0 * sin, 20.0 * cos);
        let br = Point::new(tr.x + bl.x, tr.y + bl.y);

        let quad = order_corners([br, bl, tr, tl]);
        assert_eq!(quad.top_left(), tl);
        assert_eq!(quad.top_right(), tr);
        assert_eq!(quad.bottom_left(), bl);
    }
}
