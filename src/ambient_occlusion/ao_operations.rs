//! Ambient occlusion operations
//!
//! Every vertex casts `sample_count_x * sample_count_y` any-hit rays into the
//! hemisphere around its normal, one jittered cosine-weighted direction per
//! (azimuth, elevation) stratum. The stored value is the unoccluded fraction.

use super::ao_data::AoSettings;
use super::ao_data::AoStatus;
use crate::error::{ViewerError, ViewerResult};
use crate::geometry::aabb::aabb_diagonal;
use crate::geometry::Ray;
use crate::mesh::{vertex_normals, TexturedMesh};
use crate::sampling::{cosine_hemisphere, jittered_stratum, mix_seed, to_world};
use crate::spatial::{build_grid, grid_any_hit, grid_stats, SpatialGrid};
use cgmath::{InnerSpace, Point3, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Compute per-vertex ambient occlusion for every mesh in place.
///
/// `progress` receives a phase label and the completed fraction and returns
/// true to cancel.
pub fn ambient_occlusion<P>(
    meshes: &mut [TexturedMesh],
    progress: P,
    sample_count_x: u32,
    sample_count_y: u32,
) -> ViewerResult<AoStatus>
where
    P: FnMut(&str, f32) -> bool,
{
    let settings = AoSettings {
        sample_count_x,
        sample_count_y,
        ..AoSettings::default()
    };
    ambient_occlusion_with(meshes, &settings, progress)
}

pub fn validate_ao_settings(settings: &AoSettings) -> ViewerResult<()> {
    if settings.sample_count_x == 0 {
        return Err(ViewerError::invalid_config("sample_count_x", 0, "must be at least 1"));
    }
    if settings.sample_count_y == 0 {
        return Err(ViewerError::invalid_config("sample_count_y", 0, "must be at least 1"));
    }
    if settings.sample_count_x.checked_mul(settings.sample_count_y).is_none() {
        return Err(ViewerError::invalid_config(
            "sample_count",
            format!("{}x{}", settings.sample_count_x, settings.sample_count_y),
            "direction count overflows",
        ));
    }
    if settings.batch_size == 0 {
        return Err(ViewerError::invalid_config("batch_size", 0, "must be at least 1"));
    }
    if let Some(offset) = settings.offset {
        if !(offset.is_finite() && offset >= 0.0) {
            return Err(ViewerError::invalid_config(
                "offset",
                offset,
                "must be finite and non-negative",
            ));
        }
    }
    Ok(())
}

/// Compute per-vertex ambient occlusion with explicit settings.
///
/// Meshes are processed in order and a mesh's `ao` is replaced only once all
/// of its vertices are done. Directions depend only on
/// `(seed, mesh index, vertex index)`, so repeated runs are identical.
pub fn ambient_occlusion_with<P>(
    meshes: &mut [TexturedMesh],
    settings: &AoSettings,
    mut progress: P,
) -> ViewerResult<AoStatus>
where
    P: FnMut(&str, f32) -> bool,
{
    if meshes.is_empty() {
        return Err(ViewerError::NoMeshes);
    }
    validate_ao_settings(settings)?;

    let grid = build_grid(meshes);
    let offset = settings
        .offset
        .unwrap_or_else(|| aabb_diagonal(&grid.bounds) * 1e-4);
    let total_vertices: usize = meshes.iter().map(|m| m.vertices.len()).sum();

    log::info!(
        "[AmbientOcclusion::ambient_occlusion] {} meshes, {} vertices, {}x{} samples, {} triangles indexed",
        meshes.len(),
        total_vertices,
        settings.sample_count_x,
        settings.sample_count_y,
        grid_stats(&grid).triangle_count
    );

    let mesh_count = meshes.len();
    let mut done = 0usize;
    let fraction = |done: usize| {
        if total_vertices == 0 {
            1.0
        } else {
            done as f32 / total_vertices as f32
        }
    };

    for (mesh_index, mesh) in meshes.iter_mut().enumerate() {
        let phase = format!("Mesh {}/{}", mesh_index + 1, mesh_count);
        let mesh_seed = mix_seed(settings.seed, mesh_index as u64);

        let values = {
            let source: &TexturedMesh = &*mesh;
            let normals = vertex_normals(source);
            let mut values = vec![1.0f32; source.vertices.len()];

            for (batch_index, batch) in values.chunks_mut(settings.batch_size).enumerate() {
                let first = batch_index * settings.batch_size;
                batch.par_iter_mut().enumerate().for_each(|(k, value)| {
                    let vertex = first + k;
                    *value = vertex_visibility(
                        &grid,
                        source.vertices[vertex] + grid.offsets[mesh_index],
                        normals[vertex],
                        settings.sample_count_x,
                        settings.sample_count_y,
                        offset,
                        mix_seed(mesh_seed, vertex as u64),
                    );
                });

                done += batch.len();
                if progress(&phase, fraction(done)) {
                    log::info!(
                        "[AmbientOcclusion::ambient_occlusion] Cancelled in mesh {}, {} meshes completed",
                        mesh_index,
                        mesh_index
                    );
                    return Ok(AoStatus::Cancelled);
                }
            }
            values
        };

        mesh.ao = Some(values);
        log::debug!(
            "[AmbientOcclusion::ambient_occlusion] Mesh {} done ({} vertices)",
            mesh_index,
            mesh.vertices.len()
        );

        if progress(&phase, fraction(done)) {
            log::info!(
                "[AmbientOcclusion::ambient_occlusion] Cancelled after {} meshes",
                mesh_index + 1
            );
            return Ok(AoStatus::Cancelled);
        }
    }

    log::info!("[AmbientOcclusion::ambient_occlusion] Completed");
    Ok(AoStatus::Completed)
}

/// Unoccluded fraction of the hemisphere around `normal` at `point`.
///
/// A zero or non-finite normal has no hemisphere and counts as fully lit.
pub fn vertex_visibility(
    grid: &SpatialGrid,
    point: Point3<f32>,
    normal: Vector3<f32>,
    sample_count_x: u32,
    sample_count_y: u32,
    offset: f32,
    seed: u64,
) -> f32 {
    let length = normal.magnitude();
    if !(length > 1e-12 && length.is_finite()) {
        log::trace!("[AmbientOcclusion::vertex_visibility] Zero normal at {:?}", point);
        return 1.0;
    }
    let normal = normal / length;
    let origin = point + normal * offset;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut occluded = 0u64;
    for elevation in 0..sample_count_y {
        for azimuth in 0..sample_count_x {
            let (u, v) = jittered_stratum(&mut rng, azimuth, elevation, sample_count_x, sample_count_y);
            let direction = to_world(cosine_hemisphere(u, v), normal);
            if grid_any_hit(grid, &Ray::new(origin, direction), 0.0, f32::INFINITY) {
                occluded += 1;
            }
        }
    }

    1.0 - occluded as f32 / (sample_count_x as u64 * sample_count_y as u64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{create_quad, create_uv_sphere};

    fn sphere_cluster(neighbors: &[(f32, f32)]) -> Vec<TexturedMesh> {
        let mut meshes = vec![create_uv_sphere(Point3::new(0.0, 0.0, 0.0), 1.0, 12, 16)];
        for &(x, z) in neighbors {
            meshes.push(create_uv_sphere(Point3::new(x, 0.0, z), 1.0, 12, 16));
        }
        meshes
    }

    fn fixed_settings() -> AoSettings {
        AoSettings {
            sample_count_x: 12,
            sample_count_y: 6,
            offset: Some(1e-3),
            seed: 42,
            ..AoSettings::default()
        }
    }

    #[test]
    fn test_apex_sees_more_sky_than_equator() {
        let mut meshes = sphere_cluster(&[(2.1, 0.0), (-2.1, 0.0), (0.0, 2.1), (0.0, -2.1)]);
        let status = ambient_occlusion_with(&mut meshes, &fixed_settings(), |_, _| false).expect("ao");
        assert_eq!(status, AoStatus::Completed);

        let center = &meshes[0];
        let ao = center.ao.as_ref().expect("ao written");
        assert_eq!(ao.len(), center.vertices.len());
        assert!(ao.iter().all(|v| (0.0..=1.0).contains(v)));

        let equator = center
            .vertices
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.x.total_cmp(&b.1.x))
            .map(|(i, _)| i)
            .expect("vertices");
        assert!(ao[0] > ao[equator], "apex {} equator {}", ao[0], ao[equator]);
        assert!(ao[0] > 0.9);
    }

    #[test]
    fn test_more_occluders_never_raise_visibility() {
        let settings = fixed_settings();
        let mut sparse = sphere_cluster(&[(2.1, 0.0)]);
        let mut dense = sphere_cluster(&[(2.1, 0.0), (-2.1, 0.0), (0.0, 2.1)]);
        ambient_occlusion_with(&mut sparse, &settings, |_, _| false).expect("ao");
        ambient_occlusion_with(&mut dense, &settings, |_, _| false).expect("ao");

        let a = sparse[0].ao.as_ref().expect("ao written");
        let b = dense[0].ao.as_ref().expect("ao written");
        assert_eq!(a.len(), b.len());
        assert!(a.iter().zip(b).all(|(a, b)| b <= a));
        assert!(a.iter().zip(b).any(|(a, b)| b < a));
    }

    #[test]
    fn test_cancel_leaves_unprocessed_meshes_untouched() {
        let mut meshes = sphere_cluster(&[(2.1, 0.0), (-2.1, 0.0), (0.0, 2.1)]);
        meshes[3].ao = Some(vec![0.5; meshes[3].vertices.len()]);
        let before = meshes.clone();

        let status = ambient_occlusion_with(&mut meshes, &fixed_settings(), |phase, _| phase == "Mesh 3/4")
            .expect("ao");
        assert_eq!(status, AoStatus::Cancelled);

        assert!(meshes[0].ao.is_some());
        assert!(meshes[1].ao.is_some());
        assert_eq!(meshes[2], before[2]);
        assert_eq!(meshes[3], before[3]);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let mut first = sphere_cluster(&[(2.1, 0.0)]);
        let mut second = first.clone();
        ambient_occlusion_with(&mut first, &fixed_settings(), |_, _| false).expect("ao");
        ambient_occlusion_with(&mut second, &fixed_settings(), |_, _| false).expect("ao");
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_normal_counts_as_lit() {
        let floor = create_quad(Point3::new(0.0, 0.0, 0.0), Vector3::unit_x(), Vector3::unit_y());
        let roof = create_quad(Point3::new(0.0, 0.0, 0.5), Vector3::unit_x() * 3.0, Vector3::unit_y() * 3.0);

        let mut covered = vec![floor.clone(), roof.clone()];
        ambient_occlusion_with(&mut covered, &fixed_settings(), |_, _| false).expect("ao");
        assert!(covered[0].ao.as_ref().expect("ao written").iter().all(|&v| v < 0.5));

        let mut degenerate = floor;
        degenerate.normals = Some(vec![Vector3::new(0.0, 0.0, 0.0); 4]);
        let mut meshes = vec![degenerate, roof];
        ambient_occlusion_with(&mut meshes, &fixed_settings(), |_, _| false).expect("ao");
        assert_eq!(meshes[0].ao.as_deref(), Some(&[1.0f32; 4][..]));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            ambient_occlusion(&mut [], |_, _| false, 20, 10),
            Err(ViewerError::NoMeshes)
        ));

        let mut meshes = sphere_cluster(&[]);
        assert!(matches!(
            ambient_occlusion(&mut meshes, |_, _| false, 0, 10),
            Err(ViewerError::InvalidConfig { .. })
        ));
        assert!(matches!(
            ambient_occlusion(&mut meshes, |_, _| false, 20, 0),
            Err(ViewerError::InvalidConfig { .. })
        ));
        assert!(meshes[0].ao.is_none());
    }

    #[test]
    fn test_direction_count_overflow_is_rejected() {
        let settings = AoSettings {
            sample_count_x: u32::MAX,
            sample_count_y: 2,
            ..AoSettings::default()
        };
        match validate_ao_settings(&settings) {
            Err(ViewerError::InvalidConfig { field, .. }) => assert_eq!(field, "sample_count"),
            other => panic!("expected overflow to be rejected, got {:?}", other),
        }

        let mut meshes = sphere_cluster(&[]);
        let mut called = false;
        let result = ambient_occlusion(
            &mut meshes,
            |_, _| {
                called = true;
                false
            },
            65536,
            65536,
        );
        assert!(matches!(result, Err(ViewerError::InvalidConfig { .. })));
        assert!(!called);
        assert!(meshes[0].ao.is_none());
    }

    #[test]
    fn test_progress_reaches_one() {
        let mut meshes = sphere_cluster(&[(2.1, 0.0)]);
        let mut last = 0.0;
        let mut phases = Vec::new();
        ambient_occlusion(
            &mut meshes,
            |phase, fraction| {
                assert!(fraction >= last);
                last = fraction;
                phases.push(phase.to_string());
                false
            },
            4,
            2,
        )
        .expect("ao");
        assert!((last - 1.0).abs() < 1e-6);
        assert!(phases.contains(&"Mesh 1/2".to_string()));
        assert!(phases.contains(&"Mesh 2/2".to_string()));
    }
}
