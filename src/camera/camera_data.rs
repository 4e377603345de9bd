//! Camera data structures
//!
//! Plain data. All transformations happen in camera_operations.rs

use cgmath::{Point3, Vector3};

/// Perspective camera passed by value into every render call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    /// Eye position in world space
    pub position: Point3<f32>,

    /// Unit view direction
    pub direction: Vector3<f32>,

    /// Approximate up vector, orthogonalized against `direction`
    pub up: Vector3<f32>,

    /// Field of view (vertical, radians)
    pub fov_radians: f32,

    /// Viewport width in pixels
    pub width: u32,

    /// Viewport height in pixels
    pub height: u32,
}

/// Orthonormal frame derived from a camera, cached for per-pixel work
#[derive(Debug, Clone, Copy)]
pub struct CameraBasis {
    pub origin: Point3<f32>,
    pub forward: Vector3<f32>,
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,

    /// tan(fov / 2)
    pub tan_half_fov: f32,

    /// width / height
    pub aspect_ratio: f32,

    pub width: f32,
    pub height: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            direction: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov_radians: 45.0_f32.to_radians(),
            width: 640,
            height: 480,
        }
    }
}
