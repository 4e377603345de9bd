//! Uniform grid data structures
//!
//! NO METHODS. All construction and traversal lives in grid_operations.rs

use crate::geometry::AABB;
use crate::mesh::{MeshId, TriangleId};
use cgmath::{Point3, Vector3};

/// Largest number of cells along any axis
pub const MAX_GRID_DIMENSION: u32 = 128;

/// Target number of cells per indexed triangle
pub const CELLS_PER_TRIANGLE: f32 = 2.0;

/// Snapshot of one indexed triangle
#[derive(Debug, Clone, Copy)]
pub struct GridTriangle {
    pub vertices: [Point3<f32>; 3],
    pub mesh: MeshId,
    pub triangle: TriangleId,
}

/// Uniform grid over the triangles of a mesh set.
///
/// Cell contents are stored compressed: the triangle indices of cell `c` are
/// `cell_entries[cell_start[c]..cell_start[c + 1]]`.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    pub bounds: AABB,
    pub dims: [u32; 3],
    pub cell_size: Vector3<f32>,
    pub triangles: Vec<GridTriangle>,
    pub cell_start: Vec<u32>,
    pub cell_entries: Vec<u32>,

    /// Per-mesh translation applied to vertices when the grid was built
    pub offsets: Vec<Vector3<f32>>,

    /// Triangles rejected as degenerate or malformed during the build
    pub skipped_triangles: usize,
}

/// Closest intersection reported by a nearest-hit query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHit {
    pub mesh: MeshId,
    pub triangle: TriangleId,
    pub t: f32,

    /// Barycentric weights for the triangle's three corners
    pub weights: [f32; 3],
}

/// Grid statistics
#[derive(Debug, Clone)]
pub struct GridStats {
    pub triangle_count: usize,
    pub skipped_triangles: usize,
    pub cell_count: usize,
    pub empty_cells: usize,
    pub entry_count: usize,
    pub max_entries_per_cell: usize,
}
