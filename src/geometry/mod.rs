//! Geometry primitives - rays, triangle intersection and bounding boxes
//!
//! Pure math, no state.

pub mod aabb;
mod ray;

pub use aabb::AABB;
pub use ray::{
    intersect_triangle, is_degenerate, triangle_area, triangle_cross, Ray, TriangleHit,
    INTERSECTION_EPSILON,
};
