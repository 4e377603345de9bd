/// Axis-Aligned Bounding Box
///
/// Pure functions over plain data, used by the spatial grid for triangle
/// binning and ray clipping.

use super::ray::Ray;
use cgmath::{InnerSpace, Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

/// Inverted box that any point extension turns into a valid one
pub fn empty_aabb() -> AABB {
    AABB {
        min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
        max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
    }
}

/// Grow AABB to include a point
pub fn aabb_extend(aabb: &AABB, point: Point3<f32>) -> AABB {
    AABB {
        min: Point3::new(
            aabb.min.x.min(point.x),
            aabb.min.y.min(point.y),
            aabb.min.z.min(point.z),
        ),
        max: Point3::new(
            aabb.max.x.max(point.x),
            aabb.max.y.max(point.y),
            aabb.max.z.max(point.z),
        ),
    }
}

/// Smallest AABB enclosing all points
pub fn aabb_from_points<I>(points: I) -> AABB
where
    I: IntoIterator<Item = Point3<f32>>,
{
    points
        .into_iter()
        .fold(empty_aabb(), |aabb, p| aabb_extend(&aabb, p))
}

/// Uniformly grow the box by `margin` on every side
pub fn aabb_inflated(aabb: &AABB, margin: f32) -> AABB {
    let m = Vector3::new(margin, margin, margin);
    AABB {
        min: aabb.min - m,
        max: aabb.max + m,
    }
}

pub fn aabb_size(aabb: &AABB) -> Vector3<f32> {
    aabb.max - aabb.min
}

pub fn aabb_diagonal(aabb: &AABB) -> f32 {
    aabb_size(aabb).magnitude()
}

/// Slab test. Returns the parametric interval `[t_enter, t_exit]` of the ray
/// inside the box, clipped to `[t_min, t_max]`.
pub fn aabb_ray_interval(aabb: &AABB, ray: &Ray, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
    let mut t_enter = t_min;
    let mut t_exit = t_max;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

        if dir.abs() < 1e-12 {
            // Parallel to this slab
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / dir;
        let t1 = (lo - origin) * inv;
        let t2 = (hi - origin) * inv;
        t_enter = t_enter.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));

        if t_enter > t_exit {
            return None;
        }
    }

    Some((t_enter, t_exit))
}
