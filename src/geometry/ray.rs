use cgmath::{InnerSpace, Point3, Vector3};

/// Determinant threshold below which a ray is treated as parallel to a triangle
pub const INTERSECTION_EPSILON: f32 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}

/// Ray parameter and barycentric coordinates of a ray/triangle intersection.
///
/// The hit point is `v0 + u * (v1 - v0) + v * (v2 - v0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl TriangleHit {
    /// Barycentric weights for (v0, v1, v2)
    pub fn weights(&self) -> [f32; 3] {
        [1.0 - self.u - self.v, self.u, self.v]
    }
}

/// Two-sided Möller–Trumbore intersection restricted to `t_min < t < t_max`.
pub fn intersect_triangle(
    ray: &Ray,
    v0: Point3<f32>,
    v1: Point3<f32>,
    v2: Point3<f32>,
    t_min: f32,
    t_max: f32,
) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let pvec = ray.direction.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < INTERSECTION_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    if t <= t_min || t >= t_max {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Unnormalized geometric normal (length = twice the area)
pub fn triangle_cross(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> Vector3<f32> {
    (v1 - v0).cross(v2 - v0)
}

pub fn triangle_area(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> f32 {
    0.5 * triangle_cross(v0, v1, v2).magnitude()
}

/// Zero-area or non-finite triangles cannot be hit reliably and are skipped
pub fn is_degenerate(v0: Point3<f32>, v1: Point3<f32>, v2: Point3<f32>) -> bool {
    let area = triangle_area(v0, v1, v2);
    !area.is_finite() || area <= f32::EPSILON * f32::EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> [Point3<f32>; 3] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 5.0));
        assert!((ray.direction.magnitude() - 1.0).abs() < 1e-6);
        assert_eq!(ray.at(2.0), Point3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_hit_from_both_sides() {
        let [a, b, c] = unit_triangle();
        let front = Ray::new(Point3::new(0.25, 0.25, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Point3::new(0.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));

        let hit = intersect_triangle(&front, a, b, c, 0.0, f32::INFINITY).expect("front hit");
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.u - 0.25).abs() < 1e-6);
        assert!((hit.v - 0.25).abs() < 1e-6);
        assert!(intersect_triangle(&back, a, b, c, 0.0, f32::INFINITY).is_some());
    }

    #[test]
    fn test_miss_outside_and_out_of_range() {
        let [a, b, c] = unit_triangle();
        let outside = Ray::new(Point3::new(0.8, 0.8, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(intersect_triangle(&outside, a, b, c, 0.0, f32::INFINITY).is_none());

        let inside = Ray::new(Point3::new(0.1, 0.1, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(intersect_triangle(&inside, a, b, c, 0.0, 0.5).is_none());
        assert!(intersect_triangle(&inside, a, b, c, 1.5, 3.0).is_none());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let [a, b, c] = unit_triangle();
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert!(intersect_triangle(&ray, a, b, c, 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn test_degenerate_triangle() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(is_degenerate(p, p, Point3::new(4.0, 5.0, 6.0)));
        let collinear = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        assert!(is_degenerate(collinear[0], collinear[1], collinear[2]));
        let [a, b, c] = unit_triangle();
        assert!(!is_degenerate(a, b, c));
        assert!((triangle_area(a, b, c) - 0.5).abs() < 1e-6);
    }
}
