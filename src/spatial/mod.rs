//! Spatial index - uniform grid over mesh triangles
//!
//! Built once per pass from a snapshot of the mesh set, read-only afterwards
//! and therefore safe to query from many threads.

pub mod grid_data;
pub mod grid_operations;

pub use grid_data::{GridHit, GridStats, GridTriangle, SpatialGrid};
pub use grid_operations::{build_grid, grid_any_hit, grid_is_empty, grid_nearest_hit, grid_stats};
