use glam::Vec2;

/// Signed polygon area via the shoelace formula.
///
/// Positive for counter-clockwise winding in a y-up frame, which is clockwise
/// on screen. Fewer than three points have zero area.
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.perp_dot(b);
    }
    sum * 0.5
}

/// Vertex average. Cheap and stable for the near-regular rings used here.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    if points.is_empty() {
        return Vec2::ZERO;
    }
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

/// Even-odd ray casting test.
pub fn point_in_polygon(point: Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        let dy = pj.y - pi.y;
        if dy.abs() > 1e-10
            && ((pi.y > point.y) != (pj.y > point.y))
            && point.x < (pj.x - pi.x) * (point.y - pi.y) / dy + pi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Smooth Hermite interpolation, GLSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_signed_area_flips_with_winding() {
        let mut square = unit_square();
        assert!((signed_area(&square) - 1.0).abs() < 1e-6);
        square.reverse();
        assert!((signed_area(&square) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_polygon_has_zero_area() {
        assert_eq!(signed_area(&[Vec2::ZERO, Vec2::ONE]), 0.0);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = unit_square();
        assert!(point_in_polygon(Vec2::new(0.5, 0.5), &square));
        assert!(!point_in_polygon(Vec2::new(1.5, 0.5), &square));
    }

    #[test]
    fn test_centroid_of_square() {
        assert_eq!(centroid(&unit_square()), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn test_smoothstep_endpoints() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }
}
