//! Offline render of a demo scene
//!
//! Usage: meshview-render [settings.toml] [output.png]
//!
//! Computes ambient occlusion for a ground plane with a few spheres, renders
//! the scene with the configured sun and shading, and saves the result.

use anyhow::{Context, Result};
use cgmath::{Point3, Vector3};
use meshview::camera::look_at;
use meshview::mesh::{create_quad, create_uv_sphere};
use meshview::task::{
    create_task_group_with_threads, is_task_finished, submit_ambient_occlusion, submit_render,
    task_phase, task_progress, wait_for_task, TaskHandle,
};
use meshview::{load_settings, save_framebuffer, AoStatus, RenderSettings, RenderStatus, TexturedMesh};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn demo_scene() -> Vec<TexturedMesh> {
    let mut ground = create_quad(
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(6.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -6.0),
    );
    ground.material_color = Vector3::new(0.75, 0.72, 0.65);

    let spheres = [
        (Point3::new(0.0, 1.0, 0.0), 1.0, Vector3::new(0.8, 0.3, 0.25)),
        (Point3::new(2.2, 0.6, 0.8), 0.6, Vector3::new(0.3, 0.6, 0.8)),
        (Point3::new(-1.8, 0.8, -1.2), 0.8, Vector3::new(0.4, 0.75, 0.35)),
    ];

    let mut meshes = vec![ground];
    for (center, radius, color) in spheres {
        let mut sphere = create_uv_sphere(center, radius, 32, 48);
        sphere.material_color = color;
        meshes.push(sphere);
    }
    meshes
}

/// Log progress until the task finishes
fn follow<T>(handle: &TaskHandle<T>) {
    let mut last_logged = -1.0;
    while !is_task_finished(handle) {
        let progress = task_progress(handle);
        if progress - last_logged >= 0.1 {
            let phase = task_phase(handle);
            if phase.is_empty() {
                log::info!("[meshview-render] {}: {:.0}%", handle.label, progress * 100.0);
            } else {
                log::info!("[meshview-render] {} ({}): {:.0}%", handle.label, phase, progress * 100.0);
            }
            last_logged = progress;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => load_settings(&PathBuf::from(&path))
            .with_context(|| format!("Failed to load settings from {}", path))?,
        None => RenderSettings::default(),
    };
    settings.validate()?;
    let output = PathBuf::from(args.next().unwrap_or_else(|| "render.png".to_string()));

    let group = create_task_group_with_threads("meshview-render", settings.worker_threads)?;

    let handle = submit_ambient_occlusion(&group, demo_scene(), settings.ao_settings())?;
    follow(&handle);
    let ao = wait_for_task(handle)?;
    if ao.status == AoStatus::Cancelled {
        log::warn!("[meshview-render] Ambient occlusion was cancelled");
    }

    let camera = look_at(
        Point3::new(0.0, 3.5, 7.5),
        Point3::new(0.0, 0.6, 0.0),
        Vector3::unit_y(),
        settings.fov_degrees,
        settings.viewport_width,
        settings.viewport_height,
    )?;
    let view = settings.render_view(camera)?;

    let handle = submit_render(&group, Arc::new(ao.meshes), view)?;
    follow(&handle);
    let outcome = wait_for_task(handle)?;
    if outcome.status == RenderStatus::Cancelled {
        log::warn!("[meshview-render] Render was cancelled, saving partial image");
    }

    save_framebuffer(&outcome.framebuffer, &output, &settings)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    println!("Saved render to {}", output.display());
    Ok(())
}
