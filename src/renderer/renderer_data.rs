//! Renderer data structures
//!
//! Plain data only. Pass execution and shading live in renderer_operations.rs

use crate::camera::CameraData;
use crate::framebuffer::{Color, FrameBuffer};
use crate::mesh::TexturedMesh;
use crate::spatial::SpatialGrid;
use cgmath::Vector3;
use serde::{Deserialize, Serialize};

/// Rows handed to the worker pool between two progress polls
pub const DEFAULT_BAND_HEIGHT: u32 = 8;

/// Color of wireframe and vertex overlay samples
pub const DEFAULT_WIRE_COLOR: [f32; 3] = [0.05, 0.05, 0.05];

/// Wireframe overlay drawn by a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderWire {
    #[default]
    Nothing,
    /// Visible vertices only, no surface shading
    Dots,
    /// Shaded surface with visible triangle edges on top
    Edges,
}

/// How the base color of a hit is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadingMode {
    /// Texture at the interpolated UV when available, material color otherwise
    #[default]
    Textured,
    /// Material color only
    Flat,
    /// Base color lit by the per-vertex sky visibility instead of the sun
    AmbientOcclusion,
}

/// Tunables for a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub shading: ShadingMode,
    pub samples_per_pixel: u32,
    pub band_height: u32,
    pub shadows: bool,
    pub ambient: f32,
    pub wire_color: Color,
    pub seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            shading: ShadingMode::Textured,
            samples_per_pixel: 1,
            band_height: DEFAULT_BAND_HEIGHT,
            shadows: true,
            ambient: 0.0,
            wire_color: DEFAULT_WIRE_COLOR.into(),
            seed: 0,
        }
    }
}

/// Everything a pass needs besides the scene and the target buffer
#[derive(Debug, Clone)]
pub struct RenderView {
    pub camera: CameraData,
    /// Direction towards the sun, normalized by the pass
    pub sun_direction: Vector3<f32>,
    pub wire: RenderWire,
    pub options: RenderOptions,
}

/// Rectangle of pixels covered by a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Meshes of one pass plus the index built over exactly those meshes
#[derive(Debug)]
pub struct RenderScene<'a> {
    pub meshes: &'a [TexturedMesh],
    pub grid: SpatialGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Completed,
    /// Stopped early; the framebuffer holds a valid partial image
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub framebuffer: FrameBuffer,
    pub status: RenderStatus,
}
