//! Mesh data structures
//!
//! One concrete value type covers every loader's output; optional fields
//! carry whatever a given format provides.

use cgmath::{Point3, Vector2, Vector3};
use image::RgbImage;
use std::sync::Arc;

/// Index of a mesh within the set passed to a pass
pub type MeshId = u32;

/// Index of a triangle within its mesh
pub type TriangleId = u32;

/// Default flat material color (light grey)
pub const DEFAULT_MATERIAL_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// Exponent decoding 8-bit texels to linear color, the inverse of the
/// default display gamma
pub const TEXTURE_GAMMA: f32 = 2.2;

/// Geo-reference of a mesh: vertex positions are relative to this origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Srs {
    pub origin: [f64; 3],
}

/// Triangle mesh with optional texture, normals and occlusion attribute
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedMesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f32>>,

    /// Triangles as indices into `vertices`
    pub triangles: Vec<[u32; 3]>,

    /// Per-vertex normals (same length as `vertices` when present)
    pub normals: Option<Vec<Vector3<f32>>>,

    /// Per-vertex texture coordinates (same length as `vertices` when present)
    pub uvs: Option<Vec<Vector2<f32>>>,

    /// Gamma-encoded texture image sampled through `uvs`
    pub texture: Option<Arc<RgbImage>>,

    /// Flat color used when no texture is available (linear RGB)
    pub material_color: Vector3<f32>,

    /// Per-vertex ambient occlusion, 1 = fully open sky, 0 = fully occluded
    pub ao: Option<Vec<f32>>,

    /// Optional geo-reference. Meshes of one pass are placed in the frame of
    /// the first geo-referenced mesh.
    pub srs: Option<Srs>,
}

impl Default for TexturedMesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
            normals: None,
            uvs: None,
            texture: None,
            material_color: Vector3::from(DEFAULT_MATERIAL_COLOR),
            ao: None,
            srs: None,
        }
    }
}
