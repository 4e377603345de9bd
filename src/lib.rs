// Meshview core - offline rendering and ambient occlusion for mesh inspection
//
// Data-oriented layout: plain `*_data` structs, pure `*_operations` functions.
// - geometry, camera, mesh: math and mesh access
// - spatial: uniform grid for ray queries
// - framebuffer, renderer, display: images
// - ambient_occlusion: per-vertex sky visibility
// - task: background execution with progress and cancellation

// Core
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod sampling;

// Scene
pub mod camera;
pub mod mesh;
pub mod spatial;

// Passes
pub mod ambient_occlusion;
pub mod renderer;

// Execution and output
pub mod config;
pub mod display;
pub mod task;

pub use error::{ErrorContext, ViewerError, ViewerResult};
pub use framebuffer::{Color, FrameBuffer, Pixel};
pub use geometry::{Ray, AABB};

pub use camera::{create_camera, generate_ray, look_at, CameraData};
pub use mesh::{create_quad, create_uv_sphere, Srs, TexturedMesh};
pub use spatial::{build_grid, grid_any_hit, grid_nearest_hit, GridHit, SpatialGrid};

pub use ambient_occlusion::{ambient_occlusion, ambient_occlusion_with, AoSettings, AoStatus};
pub use renderer::{
    render_into, render_meshes, render_meshes_with, PixelRegion, RenderOptions, RenderOutcome,
    RenderStatus, RenderView, RenderWire, ShadingMode,
};

pub use config::{load_settings, save_settings, RenderSettings};
pub use display::{save_framebuffer, tonemap};
pub use task::{
    create_task_group, submit_ambient_occlusion, submit_render, AoOutcome, TaskGroup, TaskHandle,
};
