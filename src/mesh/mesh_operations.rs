//! Mesh operations - pure functions over TexturedMesh data
//!
//! Attribute interpolation, texture lookup, normal estimation and a few
//! procedural builders used by tests and the demo driver.

use super::mesh_data::{Srs, TexturedMesh, TriangleId, TEXTURE_GAMMA};
use crate::geometry::triangle_cross;
use cgmath::{InnerSpace, Point3, Vector2, Vector3, Zero};
use image::RgbImage;
use std::borrow::Cow;
use std::f32::consts::PI;

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Create an untextured mesh from positions and triangles
pub fn create_mesh(vertices: Vec<Point3<f32>>, triangles: Vec<[u32; 3]>) -> TexturedMesh {
    TexturedMesh {
        vertices,
        triangles,
        ..Default::default()
    }
}

/// Two-triangle quad spanning `center ± u_axis ± v_axis`, facing `u_axis × v_axis`
pub fn create_quad(
    center: Point3<f32>,
    u_axis: Vector3<f32>,
    v_axis: Vector3<f32>,
) -> TexturedMesh {
    let normal = u_axis.cross(v_axis).normalize();
    let vertices = vec![
        center - u_axis - v_axis,
        center + u_axis - v_axis,
        center + u_axis + v_axis,
        center - u_axis + v_axis,
    ];
    TexturedMesh {
        vertices,
        triangles: vec![[0, 1, 2], [0, 2, 3]],
        normals: Some(vec![normal; 4]),
        uvs: Some(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ]),
        ..Default::default()
    }
}

/// Latitude/longitude sphere with outward winding and exact normals.
///
/// Vertex 0 is the top pole (+Y), the last vertex is the bottom pole; the
/// rings in between hold `slices` vertices each.
pub fn create_uv_sphere(center: Point3<f32>, radius: f32, stacks: u32, slices: u32) -> TexturedMesh {
    let stacks = stacks.max(2);
    let slices = slices.max(3);

    let mut vertices = Vec::with_capacity(((stacks - 1) * slices + 2) as usize);
    let mut normals = Vec::with_capacity(vertices.capacity());

    vertices.push(center + Vector3::unit_y() * radius);
    normals.push(Vector3::unit_y());

    for ring in 1..stacks {
        let theta = PI * ring as f32 / stacks as f32;
        for slice in 0..slices {
            let phi = 2.0 * PI * slice as f32 / slices as f32;
            let n = Vector3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            vertices.push(center + n * radius);
            normals.push(n);
        }
    }

    vertices.push(center - Vector3::unit_y() * radius);
    normals.push(-Vector3::unit_y());

    let bottom = vertices.len() as u32 - 1;
    let ring_start = |ring: u32| 1 + (ring - 1) * slices;

    let mut triangles = Vec::with_capacity((2 * slices * (stacks - 1)) as usize);
    for slice in 0..slices {
        let next = (slice + 1) % slices;

        // Top cap
        let first = ring_start(1);
        triangles.push([0, first + next, first + slice]);

        // Bands between rings
        for ring in 1..stacks - 1 {
            let upper = ring_start(ring);
            let lower = ring_start(ring + 1);
            triangles.push([upper + slice, upper + next, lower + slice]);
            triangles.push([upper + next, lower + next, lower + slice]);
        }

        // Bottom cap
        let last = ring_start(stacks - 1);
        triangles.push([last + slice, last + next, bottom]);
    }

    TexturedMesh {
        vertices,
        triangles,
        normals: Some(normals),
        ..Default::default()
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Positions of a triangle's corners, `None` if it references missing vertices
pub fn triangle_positions(mesh: &TexturedMesh, triangle: TriangleId) -> Option<[Point3<f32>; 3]> {
    let [a, b, c] = *mesh.triangles.get(triangle as usize)?;
    Some([
        *mesh.vertices.get(a as usize)?,
        *mesh.vertices.get(b as usize)?,
        *mesh.vertices.get(c as usize)?,
    ])
}

/// Translation from `mesh`'s own frame into the frame of `reference`.
/// Zero when either side carries no geo-reference.
pub fn srs_offset(mesh: &TexturedMesh, reference: Option<&Srs>) -> Vector3<f32> {
    match (mesh.srs.as_ref(), reference) {
        (Some(own), Some(reference)) => Vector3::new(
            (own.origin[0] - reference.origin[0]) as f32,
            (own.origin[1] - reference.origin[1]) as f32,
            (own.origin[2] - reference.origin[2]) as f32,
        ),
        _ => Vector3::zero(),
    }
}

/// Per-mesh offsets into the frame of the first geo-referenced mesh
pub fn scene_offsets(meshes: &[TexturedMesh]) -> Vec<Vector3<f32>> {
    let reference = meshes.iter().find_map(|m| m.srs.as_ref());
    meshes.iter().map(|m| srs_offset(m, reference)).collect()
}

/// Area-weighted vertex normals. Vertices touched only by degenerate
/// triangles keep a zero normal.
pub fn compute_vertex_normals(mesh: &TexturedMesh) -> Vec<Vector3<f32>> {
    let mut normals = vec![Vector3::zero(); mesh.vertices.len()];

    for (index, tri) in mesh.triangles.iter().enumerate() {
        let Some([a, b, c]) = triangle_positions(mesh, index as TriangleId) else {
            continue;
        };
        let weighted = triangle_cross(a, b, c);
        if !weighted.magnitude2().is_finite() {
            continue;
        }
        for &i in tri {
            normals[i as usize] += weighted;
        }
    }

    for n in normals.iter_mut() {
        let length = n.magnitude();
        *n = if length > 1e-20 { *n / length } else { Vector3::zero() };
    }
    normals
}

/// Mesh normals when they are present and complete, computed ones otherwise
pub fn vertex_normals(mesh: &TexturedMesh) -> Cow<'_, [Vector3<f32>]> {
    match &mesh.normals {
        Some(normals) if normals.len() == mesh.vertices.len() => Cow::Borrowed(normals),
        _ => Cow::Owned(compute_vertex_normals(mesh)),
    }
}

// ============================================================================
// INTERPOLATION
// ============================================================================

/// Unit geometric normal of a triangle, zero for degenerate ones
pub fn face_normal(mesh: &TexturedMesh, triangle: TriangleId) -> Vector3<f32> {
    match triangle_positions(mesh, triangle) {
        Some([a, b, c]) => {
            let n = triangle_cross(a, b, c);
            let length = n.magnitude();
            if length > 0.0 && length.is_finite() {
                n / length
            } else {
                Vector3::zero()
            }
        }
        None => Vector3::zero(),
    }
}

/// Smooth normal at barycentric `weights`, falling back to the face normal
pub fn interpolate_normal(mesh: &TexturedMesh, triangle: TriangleId, weights: [f32; 3]) -> Vector3<f32> {
    if let (Some(normals), Some(tri)) = (&mesh.normals, mesh.triangles.get(triangle as usize)) {
        if tri.iter().all(|&i| (i as usize) < normals.len()) {
            let n = normals[tri[0] as usize] * weights[0]
                + normals[tri[1] as usize] * weights[1]
                + normals[tri[2] as usize] * weights[2];
            let length = n.magnitude();
            if length > 1e-12 && length.is_finite() {
                return n / length;
            }
        }
    }
    face_normal(mesh, triangle)
}

pub fn interpolate_uv(mesh: &TexturedMesh, triangle: TriangleId, weights: [f32; 3]) -> Option<Vector2<f32>> {
    let uvs = mesh.uvs.as_ref()?;
    let tri = mesh.triangles.get(triangle as usize)?;
    let mut uv = Vector2::zero();
    for (k, &i) in tri.iter().enumerate() {
        uv += *uvs.get(i as usize)? * weights[k];
    }
    Some(uv)
}

pub fn interpolate_ao(mesh: &TexturedMesh, triangle: TriangleId, weights: [f32; 3]) -> Option<f32> {
    let ao = mesh.ao.as_ref()?;
    let tri = mesh.triangles.get(triangle as usize)?;
    let mut value = 0.0;
    for (k, &i) in tri.iter().enumerate() {
        value += *ao.get(i as usize)? * weights[k];
    }
    Some(value)
}

/// Nearest-texel lookup with wrapping; `v = 0` is the bottom row.
/// Texels are decoded to linear color.
pub fn sample_texture(texture: &RgbImage, uv: Vector2<f32>) -> Vector3<f32> {
    let (width, height) = texture.dimensions();
    if width == 0 || height == 0 {
        return Vector3::zero();
    }

    let u = uv.x - uv.x.floor();
    let v = uv.y - uv.y.floor();
    let x = ((u * width as f32) as u32).min(width - 1);
    let y = (((1.0 - v) * height as f32) as u32).min(height - 1);

    let texel = texture.get_pixel(x, y);
    let decode = |channel: u8| (channel as f32 / 255.0).powf(TEXTURE_GAMMA);
    Vector3::new(decode(texel[0]), decode(texel[1]), decode(texel[2]))
}

/// Surface color at a hit: texture when sampled coordinates exist, flat otherwise
pub fn base_color(mesh: &TexturedMesh, triangle: TriangleId, weights: [f32; 3], use_texture: bool) -> Vector3<f32> {
    if use_texture {
        if let (Some(texture), Some(uv)) = (&mesh.texture, interpolate_uv(mesh, triangle, weights)) {
            return sample_texture(texture, uv);
        }
    }
    mesh.material_color
}
