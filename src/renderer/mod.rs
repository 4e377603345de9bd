//! Renderer Module
//!
//! CPU ray-cast renderer writing into accumulation framebuffers.
//!
//! - renderer_data.rs: options, views, pass results
//! - renderer_operations.rs: pass execution and shading
//! - wire_overlay.rs: edge and vertex overlays

pub mod renderer_data;
pub mod renderer_operations;
pub mod wire_overlay;

pub use renderer_data::{
    PixelRegion, RenderOptions, RenderOutcome, RenderScene, RenderStatus, RenderView, RenderWire,
    ShadingMode, DEFAULT_BAND_HEIGHT, DEFAULT_WIRE_COLOR,
};

pub use renderer_operations::{
    // Setup
    create_render_view,
    prepare_scene,
    validate_view,

    // Passes
    render_into,
    render_meshes,
    render_meshes_with,
};

pub use wire_overlay::is_point_visible;
