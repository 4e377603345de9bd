//! Renderer operations
//!
//! A pass casts one or more camera rays per pixel, shades the nearest hit
//! against a directional sun and accumulates the result into a FrameBuffer.
//! Rows are processed in bands: each band is split across the rayon pool one
//! row per task, then the caller's progress callback is polled.

use super::renderer_data::{
    PixelRegion, RenderOptions, RenderOutcome, RenderScene, RenderStatus, RenderView, RenderWire,
    ShadingMode,
};
use super::wire_overlay::{edge_overlay_pixels, vertex_overlay_pixels};
use crate::camera::{camera_basis, generate_ray, validate_camera, CameraBasis, CameraData};
use crate::error::{ViewerError, ViewerResult};
use crate::framebuffer::{Color, FrameBuffer, Pixel};
use crate::geometry::aabb::aabb_diagonal;
use crate::geometry::Ray;
use crate::mesh::{base_color, interpolate_ao, interpolate_normal, TexturedMesh};
use crate::sampling::{jittered_stratum, mix_seed};
use crate::spatial::{build_grid, grid_any_hit, grid_nearest_hit, grid_stats, GridHit};
use cgmath::{InnerSpace, Vector3, Zero};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Share of the progress range spent on surface shading when an overlay follows
const SURFACE_PROGRESS_WITH_EDGES: f32 = 0.8;

/// Read-only state shared by the workers of one pass
struct PassContext<'a> {
    scene: &'a RenderScene<'a>,
    options: &'a RenderOptions,
    basis: CameraBasis,
    sun: Vector3<f32>,
    shadow_offset: f32,
    pass: u32,
}

// ============================================================================
// SETUP
// ============================================================================

/// Index `meshes` for rendering. Mesh ids in hits are indices into `meshes`.
pub fn prepare_scene(meshes: &[TexturedMesh]) -> RenderScene<'_> {
    let grid = build_grid(meshes);
    let stats = grid_stats(&grid);
    log::debug!(
        "[Renderer::prepare_scene] {} meshes, {} triangles indexed ({} skipped), {} cells",
        meshes.len(),
        stats.triangle_count,
        stats.skipped_triangles,
        stats.cell_count
    );
    RenderScene { meshes, grid }
}

/// Build and validate a view
pub fn create_render_view(
    camera: CameraData,
    sun_direction: Vector3<f32>,
    wire: RenderWire,
    options: RenderOptions,
) -> ViewerResult<RenderView> {
    let view = RenderView {
        camera,
        sun_direction,
        wire,
        options,
    };
    validate_view(&view)?;
    Ok(view)
}

pub fn validate_view(view: &RenderView) -> ViewerResult<()> {
    validate_camera(&view.camera)?;

    let length = view.sun_direction.magnitude();
    if !(length.is_finite() && length > 1e-12) {
        return Err(ViewerError::invalid_config(
            "sun_direction",
            format!("{:?}", view.sun_direction),
            "must be a finite non-zero vector",
        ));
    }

    let options = &view.options;
    if options.samples_per_pixel == 0 {
        return Err(ViewerError::invalid_config("samples_per_pixel", 0, "must be at least 1"));
    }
    if options.band_height == 0 {
        return Err(ViewerError::invalid_config("band_height", 0, "must be at least 1"));
    }
    if !(0.0..=1.0).contains(&options.ambient) {
        return Err(ViewerError::invalid_config(
            "ambient",
            options.ambient,
            "must be between 0 and 1",
        ));
    }
    Ok(())
}

// ============================================================================
// PASSES
// ============================================================================

/// Render `meshes` into a fresh framebuffer with default options.
///
/// `progress` receives the completed fraction and returns true to cancel.
pub fn render_meshes<P>(
    meshes: &[TexturedMesh],
    sun_direction: Vector3<f32>,
    camera: &CameraData,
    wire: RenderWire,
    progress: P,
) -> ViewerResult<RenderOutcome>
where
    P: FnMut(f32) -> bool,
{
    let view = RenderView {
        camera: *camera,
        sun_direction,
        wire,
        options: RenderOptions::default(),
    };
    render_meshes_with(meshes, &view, progress)
}

/// Render `meshes` into a fresh framebuffer sized to the view's camera.
///
/// An empty mesh set yields a framebuffer with every pixel unsampled.
pub fn render_meshes_with<P>(
    meshes: &[TexturedMesh],
    view: &RenderView,
    progress: P,
) -> ViewerResult<RenderOutcome>
where
    P: FnMut(f32) -> bool,
{
    validate_view(view)?;
    let mut framebuffer = FrameBuffer::new(view.camera.width, view.camera.height);

    if meshes.is_empty() {
        log::info!("[Renderer::render_meshes] No meshes, framebuffer left unsampled");
        return Ok(RenderOutcome {
            framebuffer,
            status: RenderStatus::Completed,
        });
    }

    let scene = prepare_scene(meshes);
    let region = PixelRegion::full(view.camera.width, view.camera.height);
    let status = render_into(&mut framebuffer, &scene, view, region, 0, progress)?;
    Ok(RenderOutcome {
        framebuffer,
        status,
    })
}

/// Add one pass worth of samples for `region` to an existing framebuffer.
///
/// Pass 0 with one sample per pixel shoots through pixel centers; later passes
/// jitter within a stratified sub-pixel grid seeded from
/// `(seed, pass, x, y)`, so repeated calls refine the image progressively.
/// On cancellation the samples added so far are kept.
pub fn render_into<P>(
    framebuffer: &mut FrameBuffer,
    scene: &RenderScene<'_>,
    view: &RenderView,
    region: PixelRegion,
    pass: u32,
    mut progress: P,
) -> ViewerResult<RenderStatus>
where
    P: FnMut(f32) -> bool,
{
    validate_view(view)?;
    let (width, height) = (framebuffer.width(), framebuffer.height());
    if (width, height) != (view.camera.width, view.camera.height) {
        return Err(ViewerError::invalid_camera(format!(
            "viewport {}x{} does not match framebuffer {}x{}",
            view.camera.width, view.camera.height, width, height
        )));
    }

    let region = clip_region(region, width, height);
    if region.width == 0 || region.height == 0 {
        return Ok(RenderStatus::Completed);
    }

    log::info!(
        "[Renderer::render_into] Pass {} over {}x{} pixels at ({}, {}), wire {:?}, shading {:?}",
        pass,
        region.width,
        region.height,
        region.x,
        region.y,
        view.wire,
        view.options.shading
    );

    let context = PassContext {
        scene,
        options: &view.options,
        basis: camera_basis(&view.camera),
        sun: view.sun_direction.normalize(),
        shadow_offset: aabb_diagonal(&scene.grid.bounds) * 1e-4,
        pass,
    };

    let surface_share = match view.wire {
        RenderWire::Nothing => 1.0,
        RenderWire::Edges => SURFACE_PROGRESS_WITH_EDGES,
        RenderWire::Dots => 0.0,
    };

    if view.wire != RenderWire::Dots {
        let columns = region.x..region.x + region.width;
        let end = region.y + region.height;
        let mut band_start = region.y;

        while band_start < end {
            let band_end = (band_start + view.options.band_height).min(end);
            framebuffer
                .rows_mut(band_start..band_end)
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(offset, row)| {
                    render_row(&context, band_start + offset as u32, columns.clone(), row);
                });
            band_start = band_end;

            let fraction = surface_share * (band_start - region.y) as f32 / region.height as f32;
            if progress(fraction) {
                log::info!(
                    "[Renderer::render_into] Cancelled at {:.0}%",
                    fraction * 100.0
                );
                return Ok(RenderStatus::Cancelled);
            }
        }
    }

    if view.wire != RenderWire::Nothing {
        let wire_color = view.options.wire_color;
        for (index, mesh) in scene.meshes.iter().enumerate() {
            let offset = scene.grid.offsets.get(index).copied().unwrap_or_else(Vector3::zero);
            let pixels = match view.wire {
                RenderWire::Edges => edge_overlay_pixels(&scene.grid, &context.basis, &region, mesh, offset),
                _ => vertex_overlay_pixels(&scene.grid, &context.basis, &region, mesh, offset),
            };
            for (x, y) in pixels {
                framebuffer.add_sample(x, y, wire_color);
            }

            let fraction = surface_share
                + (1.0 - surface_share) * (index + 1) as f32 / scene.meshes.len() as f32;
            if progress(fraction) {
                log::info!(
                    "[Renderer::render_into] Cancelled during {:?} overlay",
                    view.wire
                );
                return Ok(RenderStatus::Cancelled);
            }
        }
    }

    log::info!(
        "[Renderer::render_into] Pass {} finished, {} pixels sampled",
        pass,
        framebuffer.sampled_count()
    );
    Ok(RenderStatus::Completed)
}

fn clip_region(region: PixelRegion, width: u32, height: u32) -> PixelRegion {
    let x = region.x.min(width);
    let y = region.y.min(height);
    PixelRegion {
        x,
        y,
        width: region.width.min(width - x),
        height: region.height.min(height - y),
    }
}

// ============================================================================
// SAMPLING
// ============================================================================

fn render_row(context: &PassContext<'_>, y: u32, columns: std::ops::Range<u32>, row: &mut [Pixel]) {
    let samples = context.options.samples_per_pixel;
    let centered = samples == 1 && context.pass == 0;
    let strata_x = (samples as f32).sqrt().ceil() as u32;
    let strata_y = (samples + strata_x - 1) / strata_x;

    for x in columns {
        let pixel = &mut row[x as usize];
        let key = ((context.pass as u64) << 48) ^ ((y as u64) << 24) ^ x as u64;
        let mut rng = StdRng::seed_from_u64(mix_seed(context.options.seed, key));

        for sample in 0..samples {
            let (dx, dy) = if centered {
                (0.5, 0.5)
            } else {
                jittered_stratum(&mut rng, sample % strata_x, sample / strata_x, strata_x, strata_y)
            };
            let ray = generate_ray(&context.basis, x as f32 + dx, y as f32 + dy);
            if let Some(hit) = grid_nearest_hit(&context.scene.grid, &ray, 0.0, f32::INFINITY) {
                pixel.add(shade_hit(context, &ray, &hit));
            }
        }
    }
}

// ============================================================================
// SHADING
// ============================================================================

/// Color of the surface seen along `ray` at `hit`
fn shade_hit(context: &PassContext<'_>, ray: &Ray, hit: &GridHit) -> Color {
    let mesh = &context.scene.meshes[hit.mesh as usize];
    let options = context.options;

    let mut normal = interpolate_normal(mesh, hit.triangle, hit.weights);
    if normal.dot(ray.direction) > 0.0 {
        normal = -normal;
    }

    match options.shading {
        ShadingMode::AmbientOcclusion => {
            let sky = interpolate_ao(mesh, hit.triangle, hit.weights).unwrap_or(1.0);
            base_color(mesh, hit.triangle, hit.weights, true) * sky.clamp(0.0, 1.0)
        }
        ShadingMode::Textured | ShadingMode::Flat => {
            let base = base_color(
                mesh,
                hit.triangle,
                hit.weights,
                options.shading == ShadingMode::Textured,
            );
            let mut light = normal.dot(context.sun).max(0.0);
            if light > 0.0 && options.shadows {
                let origin = ray.at(hit.t) + normal * context.shadow_offset;
                let shadow_ray = Ray::new(origin, context.sun);
                if grid_any_hit(&context.scene.grid, &shadow_ray, 0.0, f32::INFINITY) {
                    light = 0.0;
                }
            }
            base * (options.ambient + (1.0 - options.ambient) * light)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{create_camera, project_point};
    use crate::mesh::{create_quad, create_uv_sphere};
    use cgmath::Point3;

    fn head_on_camera(width: u32, height: u32) -> CameraData {
        create_camera(
            Point3::new(0.0, 0.0, 4.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
            50.0,
            width,
            height,
        )
        .expect("valid camera")
    }

    fn white_quad() -> TexturedMesh {
        let mut quad = create_quad(Point3::new(0.0, 0.0, 0.0), Vector3::unit_x(), Vector3::unit_y());
        quad.material_color = Vector3::new(1.0, 1.0, 1.0);
        quad
    }

    fn flat_options() -> RenderOptions {
        RenderOptions {
            shading: ShadingMode::Flat,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_head_on_quad() {
        let camera = head_on_camera(48, 40);
        let meshes = vec![white_quad()];
        let view = create_render_view(camera, Vector3::unit_z(), RenderWire::Nothing, flat_options())
            .expect("valid view");

        let outcome = render_meshes_with(&meshes, &view, |_| false).expect("render");
        assert_eq!(outcome.status, RenderStatus::Completed);

        let basis = camera_basis(&camera);
        let (x0, y0, _) = project_point(&basis, Point3::new(-1.0, 1.0, 0.0)).expect("in front");
        let (x1, y1, _) = project_point(&basis, Point3::new(1.0, -1.0, 0.0)).expect("in front");

        let fb = &outcome.framebuffer;
        for y in 0..fb.height() {
            for x in 0..fb.width() {
                let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
                let pixel = fb.read(x, y).expect("in bounds");
                let inside = cx > x0 + 0.5 && cx < x1 - 0.5 && cy > y0 + 0.5 && cy < y1 - 0.5;
                let outside = cx < x0 - 0.5 || cx > x1 + 0.5 || cy < y0 - 0.5 || cy > y1 + 0.5;
                if inside {
                    assert!(pixel.weight >= 1, "pixel ({}, {}) not sampled", x, y);
                    assert!((pixel.color - Vector3::new(1.0, 1.0, 1.0)).magnitude() < 1e-3);
                }
                if outside {
                    assert_eq!(pixel.weight, 0, "pixel ({}, {}) sampled", x, y);
                    assert_eq!(pixel.color, Vector3::new(0.0, 0.0, 0.0));
                }
            }
        }
    }

    #[test]
    fn test_empty_mesh_set_is_unsampled() {
        let camera = head_on_camera(16, 12);
        let outcome =
            render_meshes(&[], Vector3::unit_z(), &camera, RenderWire::Edges, |_| false).expect("render");
        assert_eq!(outcome.status, RenderStatus::Completed);
        assert_eq!(outcome.framebuffer.sampled_count(), 0);
        assert!(outcome.framebuffer.pixels().iter().all(|p| p.weight == 0));
    }

    #[test]
    fn test_cancelled_render_is_subset() {
        let camera = head_on_camera(40, 40);
        let meshes = vec![
            create_uv_sphere(Point3::new(0.0, 0.0, 0.0), 1.0, 12, 16),
            white_quad(),
        ];

        let full = render_meshes(&meshes, Vector3::new(0.3, 0.5, 1.0), &camera, RenderWire::Nothing, |_| false)
            .expect("render");
        assert_eq!(full.status, RenderStatus::Completed);

        let mut polls = 0;
        let partial = render_meshes(&meshes, Vector3::new(0.3, 0.5, 1.0), &camera, RenderWire::Nothing, |_| {
            polls += 1;
            polls >= 2
        })
        .expect("render");
        assert_eq!(partial.status, RenderStatus::Cancelled);
        assert!(partial.framebuffer.sampled_count() > 0);
        assert!(partial.framebuffer.sampled_count() < full.framebuffer.sampled_count());

        for (p, f) in partial.framebuffer.pixels().iter().zip(full.framebuffer.pixels()) {
            if p.weight > 0 {
                assert!(f.weight > 0);
                assert!((p.color - f.color).magnitude() < 1e-6);
            }
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_finishes() {
        let camera = head_on_camera(20, 30);
        let meshes = vec![white_quad()];
        let mut reported = Vec::new();
        render_meshes(&meshes, Vector3::unit_z(), &camera, RenderWire::Edges, |f| {
            reported.push(f);
            false
        })
        .expect("render");

        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert!((reported.last().copied().unwrap_or(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sun_behind_surface_is_black() {
        let camera = head_on_camera(16, 16);
        let meshes = vec![white_quad()];
        let view = create_render_view(camera, -Vector3::unit_z(), RenderWire::Nothing, flat_options())
            .expect("valid view");
        let outcome = render_meshes_with(&meshes, &view, |_| false).expect("render");
        let center = outcome.framebuffer.read(8, 8).expect("in bounds");
        assert_eq!(center.weight, 1);
        assert!(center.color.magnitude() < 1e-6);
    }

    #[test]
    fn test_shadowed_point_gets_ambient_only() {
        // Small blocker between the sun and the center of the quad
        let blocker = create_quad(Point3::new(0.0, 0.0, 1.0), Vector3::unit_x() * 0.3, Vector3::unit_y() * 0.3);
        let camera = create_camera(
            Point3::new(0.0, -3.0, 0.5),
            Vector3::new(0.0, 3.0, -0.5),
            Vector3::unit_z(),
            40.0,
            32,
            32,
        )
        .expect("valid camera");
        let options = RenderOptions {
            ambient: 0.25,
            ..flat_options()
        };
        let meshes = vec![white_quad(), blocker];
        let scene = prepare_scene(&meshes);

        let shaded = |shadows: bool| {
            let view = create_render_view(
                camera,
                Vector3::unit_z(),
                RenderWire::Nothing,
                RenderOptions {
                    shadows,
                    ..options.clone()
                },
            )
            .expect("valid view");
            let context = PassContext {
                scene: &scene,
                options: &view.options,
                basis: camera_basis(&view.camera),
                sun: Vector3::unit_z(),
                shadow_offset: 1e-4,
                pass: 0,
            };
            let ray = Ray::new(Point3::new(0.0, -3.0, 0.5), Vector3::new(0.0, 3.0, -0.5));
            let hit = grid_nearest_hit(&scene.grid, &ray, 0.0, f32::INFINITY).expect("hits the quad");
            assert_eq!(hit.mesh, 0);
            shade_hit(&context, &ray, &hit)
        };

        assert!((shaded(true) - Vector3::new(0.25, 0.25, 0.25)).magnitude() < 1e-5);
        assert!((shaded(false) - Vector3::new(1.0, 1.0, 1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_dots_skip_surface_shading() {
        let camera = head_on_camera(32, 32);
        let meshes = vec![white_quad()];
        let outcome =
            render_meshes(&meshes, Vector3::unit_z(), &camera, RenderWire::Dots, |_| false).expect("render");
        assert_eq!(outcome.framebuffer.sampled_count(), 4);
        let wire: Color = crate::renderer::DEFAULT_WIRE_COLOR.into();
        for pixel in outcome.framebuffer.pixels().iter().filter(|p| p.weight > 0) {
            assert!((pixel.color - wire).magnitude() < 1e-6);
        }
    }

    #[test]
    fn test_edges_blend_with_surface() {
        let camera = head_on_camera(32, 32);
        let meshes = vec![white_quad()];
        let view = create_render_view(camera, Vector3::unit_z(), RenderWire::Edges, flat_options())
            .expect("valid view");
        let outcome = render_meshes_with(&meshes, &view, |_| false).expect("render");
        assert_eq!(outcome.status, RenderStatus::Completed);

        let wire: Color = view.options.wire_color;
        let blended: Vec<Pixel> = outcome
            .framebuffer
            .pixels()
            .iter()
            .copied()
            .filter(|p| p.weight >= 2)
            .collect();
        assert!(blended.iter().any(|p| p.color.x > wire.x + 1e-3));
        for pixel in &blended {
            assert!(pixel.color.x < 1.0 - 1e-3, "edge pixel not pulled toward wire: {:?}", pixel);
            assert!(pixel.color.x > wire.x - 1e-6);
            assert!((pixel.color.x - pixel.color.y).abs() < 1e-6);
        }

        // away from the diagonal and the border only the surface contributes
        let basis = camera_basis(&camera);
        let (x, y, _) = project_point(&basis, Point3::new(0.5, -0.5, 0.0)).expect("in front");
        let interior = outcome.framebuffer.read(x as u32, y as u32).expect("in bounds");
        assert_eq!(interior.weight, 1);
        assert!((interior.color - Vector3::new(1.0, 1.0, 1.0)).magnitude() < 1e-3);
    }

    #[test]
    fn test_refinement_passes_accumulate() {
        let camera = head_on_camera(24, 24);
        let meshes = vec![white_quad()];
        let scene = prepare_scene(&meshes);
        let view = create_render_view(
            camera,
            Vector3::unit_z(),
            RenderWire::Nothing,
            RenderOptions {
                samples_per_pixel: 4,
                ..flat_options()
            },
        )
        .expect("valid view");

        let mut fb = FrameBuffer::new(24, 24);
        let top = PixelRegion {
            x: 0,
            y: 0,
            width: 24,
            height: 12,
        };
        render_into(&mut fb, &scene, &view, top, 0, |_| false).expect("render");
        let center = fb.read(12, 11).expect("in bounds");
        assert_eq!(center.weight, 4);
        assert_eq!(fb.read(12, 12).expect("in bounds").weight, 0);

        render_into(&mut fb, &scene, &view, PixelRegion::full(24, 24), 1, |_| false).expect("render");
        assert_eq!(fb.read(12, 11).expect("in bounds").weight, 8);
        assert_eq!(fb.read(12, 12).expect("in bounds").weight, 4);
    }

    #[test]
    fn test_invalid_views_are_rejected() {
        let camera = head_on_camera(8, 8);
        assert!(matches!(
            create_render_view(camera, Vector3::new(0.0, 0.0, 0.0), RenderWire::Nothing, RenderOptions::default()),
            Err(ViewerError::InvalidConfig { .. })
        ));
        assert!(matches!(
            create_render_view(
                camera,
                Vector3::unit_z(),
                RenderWire::Nothing,
                RenderOptions {
                    samples_per_pixel: 0,
                    ..RenderOptions::default()
                }
            ),
            Err(ViewerError::InvalidConfig { .. })
        ));

        let view = create_render_view(camera, Vector3::unit_z(), RenderWire::Nothing, RenderOptions::default())
            .expect("valid view");
        let meshes = vec![white_quad()];
        let scene = prepare_scene(&meshes);
        let mut wrong_size = FrameBuffer::new(4, 4);
        assert!(matches!(
            render_into(&mut wrong_size, &scene, &view, PixelRegion::full(4, 4), 0, |_| false),
            Err(ViewerError::InvalidCamera { .. })
        ));
    }
}
