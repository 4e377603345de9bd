//! Mesh Module
//!
//! - mesh_data.rs: TexturedMesh and related plain data
//! - mesh_operations.rs: interpolation, normals, builders

pub mod mesh_data;
pub mod mesh_operations;

pub use mesh_data::{MeshId, Srs, TexturedMesh, TriangleId, DEFAULT_MATERIAL_COLOR, TEXTURE_GAMMA};
pub use mesh_operations::{
    base_color, compute_vertex_normals, create_mesh, create_quad, create_uv_sphere, face_normal,
    interpolate_ao, interpolate_normal, interpolate_uv, sample_texture, scene_offsets, srs_offset,
    triangle_positions, vertex_normals,
};
