//! Wireframe and vertex overlays
//!
//! Overlays are rasterized in screen space: edge endpoints and vertices are
//! projected with the pass camera and every touched pixel is checked for
//! visibility with a ray towards the corresponding surface point.

use super::renderer_data::PixelRegion;
use crate::camera::{project_point, CameraBasis};
use crate::geometry::{is_degenerate, triangle_cross, Ray};
use crate::mesh::{triangle_positions, TexturedMesh, TriangleId};
use crate::spatial::{grid_any_hit, SpatialGrid};
use cgmath::{InnerSpace, Point3, Vector3};
use rayon::prelude::*;
use std::collections::HashSet;

/// Fraction of the distance to a point that blockers must lie within
const VISIBILITY_TOLERANCE: f32 = 1e-3;

/// True when nothing in `grid` lies between the eye and `point`
pub fn is_point_visible(grid: &SpatialGrid, eye: Point3<f32>, point: Point3<f32>) -> bool {
    let to_point = point - eye;
    let distance = to_point.magnitude();
    if !(distance > 0.0 && distance.is_finite()) {
        return false;
    }
    let ray = Ray::new(eye, to_point);
    !grid_any_hit(grid, &ray, 0.0, distance * (1.0 - VISIBILITY_TOLERANCE))
}

fn region_pixel(region: &PixelRegion, x: f32, y: f32) -> Option<(u32, u32)> {
    if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
        return None;
    }
    let (px, py) = (x as u32, y as u32);
    let inside = px >= region.x
        && py >= region.y
        && px < region.x + region.width
        && py < region.y + region.height;
    inside.then_some((px, py))
}

/// Unique edges of the triangles that face the eye
fn front_facing_edges(mesh: &TexturedMesh, eye: Point3<f32>) -> Vec<[u32; 2]> {
    let mut edges = HashSet::new();
    for (index, tri) in mesh.triangles.iter().enumerate() {
        let Some([a, b, c]) = triangle_positions(mesh, index as TriangleId) else {
            continue;
        };
        if is_degenerate(a, b, c) {
            continue;
        }
        if triangle_cross(a, b, c).dot(a - eye) >= 0.0 {
            continue;
        }
        for (i, j) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            edges.insert([i.min(j), i.max(j)]);
        }
    }
    edges.into_iter().collect()
}

/// Visible pixels along one edge, one entry per touched pixel
fn rasterize_edge(
    grid: &SpatialGrid,
    basis: &CameraBasis,
    region: &PixelRegion,
    a: Point3<f32>,
    b: Point3<f32>,
) -> Vec<(u32, u32)> {
    let (Some((ax, ay, _)), Some((bx, by, _))) = (project_point(basis, a), project_point(basis, b))
    else {
        return Vec::new();
    };

    let steps = (bx - ax).abs().max((by - ay).abs()).ceil().max(1.0);
    if !steps.is_finite() {
        return Vec::new();
    }
    let steps = steps as u32;

    let mut pixels = Vec::new();
    let mut last = None;
    for i in 0..=steps {
        let s = i as f32 / steps as f32;
        let Some(pixel) = region_pixel(region, ax + (bx - ax) * s, ay + (by - ay) * s) else {
            continue;
        };
        if last == Some(pixel) {
            continue;
        }
        last = Some(pixel);

        let point = a + (b - a) * s;
        if is_point_visible(grid, basis.origin, point) {
            pixels.push(pixel);
        }
    }
    pixels
}

/// Pixels receiving an edge overlay sample for one mesh
pub fn edge_overlay_pixels(
    grid: &SpatialGrid,
    basis: &CameraBasis,
    region: &PixelRegion,
    mesh: &TexturedMesh,
    offset: Vector3<f32>,
) -> Vec<(u32, u32)> {
    let edges = front_facing_edges(mesh, basis.origin - offset);
    edges
        .par_iter()
        .flat_map_iter(|&[i, j]| {
            let a = mesh.vertices[i as usize] + offset;
            let b = mesh.vertices[j as usize] + offset;
            rasterize_edge(grid, basis, region, a, b)
        })
        .collect()
}

/// Pixels receiving a dot sample for one mesh, one per visible vertex
pub fn vertex_overlay_pixels(
    grid: &SpatialGrid,
    basis: &CameraBasis,
    region: &PixelRegion,
    mesh: &TexturedMesh,
    offset: Vector3<f32>,
) -> Vec<(u32, u32)> {
    mesh.vertices
        .par_iter()
        .filter_map(|&vertex| {
            let vertex = vertex + offset;
            let (x, y, _) = project_point(basis, vertex)?;
            let pixel = region_pixel(region, x, y)?;
            is_point_visible(grid, basis.origin, vertex).then_some(pixel)
        })
        .collect()
}
