//! Uniform grid construction and ray traversal
//!
//! Triangles are binned conservatively by their (slightly inflated) bounding
//! boxes. Queries walk the cells pierced by a ray in order using a 3D DDA
//! (Amanatides & Woo), testing only the triangles registered in each cell.

use super::grid_data::{
    GridHit, GridStats, GridTriangle, SpatialGrid, CELLS_PER_TRIANGLE, MAX_GRID_DIMENSION,
};
use crate::geometry::aabb::{
    aabb_diagonal, aabb_from_points, aabb_inflated, aabb_ray_interval, aabb_size, empty_aabb, AABB,
};
use crate::geometry::{intersect_triangle, is_degenerate, Ray};
use crate::mesh::{scene_offsets, triangle_positions, MeshId, TexturedMesh, TriangleId};
use cgmath::{Point3, Vector3};

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Build a grid over every non-degenerate triangle of `meshes`.
///
/// Mesh ids in query results are indices into `meshes`. Geo-referenced
/// meshes are placed in the frame of the first one that carries an origin.
pub fn build_grid(meshes: &[TexturedMesh]) -> SpatialGrid {
    let mut triangles = Vec::with_capacity(meshes.iter().map(|m| m.triangles.len()).sum());
    let mut skipped_triangles = 0usize;

    let offsets = scene_offsets(meshes);
    for (mesh_index, (mesh, &offset)) in meshes.iter().zip(&offsets).enumerate() {
        for triangle in 0..mesh.triangles.len() as TriangleId {
            match triangle_positions(mesh, triangle) {
                Some([a, b, c]) if !is_degenerate(a, b, c) => triangles.push(GridTriangle {
                    vertices: [a + offset, b + offset, c + offset],
                    mesh: mesh_index as MeshId,
                    triangle,
                }),
                _ => skipped_triangles += 1,
            }
        }
    }

    if skipped_triangles > 0 {
        log::debug!(
            "[build_grid] Skipped {} degenerate or malformed triangles",
            skipped_triangles
        );
    }

    if triangles.is_empty() {
        return SpatialGrid {
            bounds: empty_aabb(),
            dims: [1, 1, 1],
            cell_size: Vector3::new(0.0, 0.0, 0.0),
            triangles,
            cell_start: vec![0, 0],
            cell_entries: Vec::new(),
            offsets,
            skipped_triangles,
        };
    }

    let raw_bounds = aabb_from_points(triangles.iter().flat_map(|t| t.vertices.iter().copied()));
    let diagonal = aabb_diagonal(&raw_bounds).max(1e-6);
    let margin = diagonal * 1e-4;
    let bounds = aabb_inflated(&raw_bounds, margin);
    let dims = grid_resolution(&bounds, diagonal, triangles.len());
    let size = aabb_size(&bounds);
    let cell_size = Vector3::new(
        size.x / dims[0] as f32,
        size.y / dims[1] as f32,
        size.z / dims[2] as f32,
    );

    let cell_count = (dims[0] * dims[1] * dims[2]) as usize;
    let ranges: Vec<([u32; 3], [u32; 3])> = triangles
        .iter()
        .map(|t| {
            let tri_bounds = aabb_inflated(&aabb_from_points(t.vertices.iter().copied()), margin);
            (
                cell_coords(&bounds, dims, cell_size, tri_bounds.min),
                cell_coords(&bounds, dims, cell_size, tri_bounds.max),
            )
        })
        .collect();

    // Counting pass, then prefix sums, then fill
    let mut counts = vec![0u32; cell_count];
    for (lo, hi) in &ranges {
        for_each_cell(dims, *lo, *hi, |cell| counts[cell] += 1);
    }

    let mut cell_start = Vec::with_capacity(cell_count + 1);
    let mut running = 0u32;
    cell_start.push(0);
    for count in &counts {
        running += count;
        cell_start.push(running);
    }

    let mut cursor: Vec<u32> = cell_start[..cell_count].to_vec();
    let mut cell_entries = vec![0u32; running as usize];
    for (triangle_index, (lo, hi)) in ranges.iter().enumerate() {
        for_each_cell(dims, *lo, *hi, |cell| {
            cell_entries[cursor[cell] as usize] = triangle_index as u32;
            cursor[cell] += 1;
        });
    }

    let grid = SpatialGrid {
        bounds,
        dims,
        cell_size,
        triangles,
        cell_start,
        cell_entries,
        offsets,
        skipped_triangles,
    };

    log::debug!("[build_grid] {:?}", grid_stats(&grid));
    grid
}

/// Cell counts per axis giving roughly `CELLS_PER_TRIANGLE` cells per triangle.
/// Flat axes are widened for the estimate so planar scenes still get split.
fn grid_resolution(bounds: &AABB, diagonal: f32, triangle_count: usize) -> [u32; 3] {
    let size = aabb_size(bounds);
    let min_extent = diagonal / 64.0;
    let extents = [
        size.x.max(min_extent),
        size.y.max(min_extent),
        size.z.max(min_extent),
    ];
    let volume = extents[0] * extents[1] * extents[2];
    let density = (CELLS_PER_TRIANGLE * triangle_count as f32 / volume).cbrt();

    extents.map(|extent| {
        let cells = (extent * density).ceil();
        if cells.is_finite() {
            (cells as u32).clamp(1, MAX_GRID_DIMENSION)
        } else {
            1
        }
    })
}

/// Cell containing `point`, clamped to the grid
fn cell_coords(bounds: &AABB, dims: [u32; 3], cell_size: Vector3<f32>, point: Point3<f32>) -> [u32; 3] {
    let mut coords = [0u32; 3];
    for axis in 0..3 {
        let relative = (point[axis] - bounds.min[axis]) / cell_size[axis];
        coords[axis] = (relative.floor().max(0.0) as u32).min(dims[axis] - 1);
    }
    coords
}

#[inline]
fn cell_index(dims: [u32; 3], x: u32, y: u32, z: u32) -> usize {
    (x + dims[0] * (y + dims[1] * z)) as usize
}

fn for_each_cell<F: FnMut(usize)>(dims: [u32; 3], lo: [u32; 3], hi: [u32; 3], mut f: F) {
    for z in lo[2]..=hi[2] {
        for y in lo[1]..=hi[1] {
            for x in lo[0]..=hi[0] {
                f(cell_index(dims, x, y, z));
            }
        }
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Walk cells pierced by `ray` within `[t_min, t_max]` in front-to-back order.
///
/// `visit` receives the triangle indices of the cell and the ray parameter at
/// which the ray leaves it; returning `true` stops the walk.
fn traverse_cells<F>(grid: &SpatialGrid, ray: &Ray, t_min: f32, t_max: f32, mut visit: F)
where
    F: FnMut(&[u32], f32) -> bool,
{
    if grid_is_empty(grid) {
        return;
    }
    let Some((t_enter, t_exit)) = aabb_ray_interval(&grid.bounds, ray, t_min, t_max) else {
        return;
    };

    let entry = ray.at(t_enter);
    let mut cell = [0i64; 3];
    let mut step = [0i64; 3];
    let mut t_next = [f32::INFINITY; 3];
    let mut t_delta = [f32::INFINITY; 3];

    for axis in 0..3 {
        let dim = grid.dims[axis] as i64;
        let size = grid.cell_size[axis];
        let relative = (entry[axis] - grid.bounds.min[axis]) / size;
        cell[axis] = (relative.floor() as i64).clamp(0, dim - 1);

        let dir = ray.direction[axis];
        if dir > 0.0 {
            step[axis] = 1;
            let boundary = grid.bounds.min[axis] + (cell[axis] + 1) as f32 * size;
            t_next[axis] = (boundary - ray.origin[axis]) / dir;
            t_delta[axis] = size / dir;
        } else if dir < 0.0 {
            step[axis] = -1;
            let boundary = grid.bounds.min[axis] + cell[axis] as f32 * size;
            t_next[axis] = (boundary - ray.origin[axis]) / dir;
            t_delta[axis] = -size / dir;
        }
    }

    loop {
        let axis = if t_next[0] < t_next[1] {
            if t_next[0] < t_next[2] { 0 } else { 2 }
        } else if t_next[1] < t_next[2] {
            1
        } else {
            2
        };
        let cell_exit = t_next[axis].min(t_exit);

        let index = cell_index(grid.dims, cell[0] as u32, cell[1] as u32, cell[2] as u32);
        let start = grid.cell_start[index] as usize;
        let end = grid.cell_start[index + 1] as usize;
        if visit(&grid.cell_entries[start..end], cell_exit) {
            return;
        }

        if t_next[axis] >= t_exit {
            return;
        }
        cell[axis] += step[axis];
        if cell[axis] < 0 || cell[axis] >= grid.dims[axis] as i64 {
            return;
        }
        t_next[axis] += t_delta[axis];
    }
}

/// Closest intersection with `t_min < t < t_max`
pub fn grid_nearest_hit(grid: &SpatialGrid, ray: &Ray, t_min: f32, t_max: f32) -> Option<GridHit> {
    let mut best: Option<GridHit> = None;
    let mut best_t = t_max;

    traverse_cells(grid, ray, t_min, t_max, |entries, cell_exit| {
        for &entry in entries {
            let tri = &grid.triangles[entry as usize];
            let [a, b, c] = tri.vertices;
            if let Some(hit) = intersect_triangle(ray, a, b, c, t_min, best_t) {
                best_t = hit.t;
                best = Some(GridHit {
                    mesh: tri.mesh,
                    triangle: tri.triangle,
                    t: hit.t,
                    weights: hit.weights(),
                });
            }
        }
        // Later cells lie entirely beyond this one
        best.is_some() && best_t <= cell_exit
    });

    best
}

/// Whether anything intersects the ray with `t_min < t < t_max`
pub fn grid_any_hit(grid: &SpatialGrid, ray: &Ray, t_min: f32, t_max: f32) -> bool {
    let mut found = false;

    traverse_cells(grid, ray, t_min, t_max, |entries, _| {
        found = entries.iter().any(|&entry| {
            let [a, b, c] = grid.triangles[entry as usize].vertices;
            intersect_triangle(ray, a, b, c, t_min, t_max).is_some()
        });
        found
    });

    found
}

pub fn grid_is_empty(grid: &SpatialGrid) -> bool {
    grid.triangles.is_empty()
}

pub fn grid_stats(grid: &SpatialGrid) -> GridStats {
    let cell_count = grid.cell_start.len().saturating_sub(1);
    let mut empty_cells = 0;
    let mut max_entries_per_cell = 0;
    for window in grid.cell_start.windows(2) {
        let entries = (window[1] - window[0]) as usize;
        if entries == 0 {
            empty_cells += 1;
        }
        max_entries_per_cell = max_entries_per_cell.max(entries);
    }

    GridStats {
        triangle_count: grid.triangles.len(),
        skipped_triangles: grid.skipped_triangles,
        cell_count,
        empty_cells,
        entry_count: grid.cell_entries.len(),
        max_entries_per_cell,
    }
}
