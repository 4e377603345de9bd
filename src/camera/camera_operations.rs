//! Camera operations - pure functions
//!
//! Ray generation maps continuous pixel coordinates (x right, y down, pixel
//! centers at +0.5) to world-space rays. `project_point` is its inverse.

use super::camera_data::{CameraBasis, CameraData};
use crate::error::{ViewerError, ViewerResult};
use crate::geometry::Ray;
use cgmath::{InnerSpace, Point3, Vector3};

/// Points closer than this along the view axis are not projected
const NEAR_PLANE: f32 = 1e-5;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Create a validated camera looking along `direction`
pub fn create_camera(
    position: Point3<f32>,
    direction: Vector3<f32>,
    up: Vector3<f32>,
    fov_degrees: f32,
    width: u32,
    height: u32,
) -> ViewerResult<CameraData> {
    let direction_length = direction.magnitude();
    if !direction_length.is_finite() || direction_length < 1e-12 {
        return Err(ViewerError::invalid_camera("view direction has zero length"));
    }

    let camera = CameraData {
        position,
        direction: direction / direction_length,
        up,
        fov_radians: fov_degrees.to_radians(),
        width,
        height,
    };
    validate_camera(&camera)?;
    Ok(camera)
}

/// Create a validated camera looking from `position` towards `target`
pub fn look_at(
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    fov_degrees: f32,
    width: u32,
    height: u32,
) -> ViewerResult<CameraData> {
    create_camera(position, target - position, up, fov_degrees, width, height)
}

/// Check camera parameters before any work is done with them
pub fn validate_camera(camera: &CameraData) -> ViewerResult<()> {
    let fov_degrees = camera.fov_radians.to_degrees();
    if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
        return Err(ViewerError::invalid_camera(format!(
            "field of view {} deg outside (0, 180)",
            fov_degrees
        )));
    }

    if camera.width == 0 || camera.height == 0 {
        return Err(ViewerError::invalid_camera(format!(
            "viewport {}x{} has zero area",
            camera.width, camera.height
        )));
    }

    let forward_length = camera.direction.magnitude();
    if !forward_length.is_finite() || forward_length < 1e-12 {
        return Err(ViewerError::invalid_camera("view direction has zero length"));
    }

    let side = camera.direction.cross(camera.up);
    if !side.magnitude().is_finite() || side.magnitude() < 1e-6 * forward_length {
        return Err(ViewerError::invalid_camera(
            "up vector is zero or parallel to the view direction",
        ));
    }

    Ok(())
}

// ============================================================================
// PROJECTION
// ============================================================================

/// Build the orthonormal camera frame. Assumes a validated camera.
pub fn camera_basis(camera: &CameraData) -> CameraBasis {
    let forward = camera.direction.normalize();
    let right = forward.cross(camera.up).normalize();
    let up = right.cross(forward);

    CameraBasis {
        origin: camera.position,
        forward,
        right,
        up,
        tan_half_fov: (camera.fov_radians * 0.5).tan(),
        aspect_ratio: camera.width as f32 / camera.height as f32,
        width: camera.width as f32,
        height: camera.height as f32,
    }
}

/// World-space ray through continuous pixel coordinates `(x, y)`
pub fn generate_ray(basis: &CameraBasis, x: f32, y: f32) -> Ray {
    let ndc_x = (2.0 * x / basis.width - 1.0) * basis.aspect_ratio * basis.tan_half_fov;
    let ndc_y = (1.0 - 2.0 * y / basis.height) * basis.tan_half_fov;
    let direction = basis.forward + basis.right * ndc_x + basis.up * ndc_y;
    Ray::new(basis.origin, direction)
}

/// Continuous pixel coordinates and view depth of a world point, or `None`
/// if the point lies behind the camera.
pub fn project_point(basis: &CameraBasis, point: Point3<f32>) -> Option<(f32, f32, f32)> {
    let d = point - basis.origin;
    let depth = d.dot(basis.forward);
    if depth <= NEAR_PLANE {
        return None;
    }

    let sx = d.dot(basis.right) / depth;
    let sy = d.dot(basis.up) / depth;
    let x = (sx / (basis.aspect_ratio * basis.tan_half_fov) + 1.0) * 0.5 * basis.width;
    let y = (1.0 - sy / basis.tan_half_fov) * 0.5 * basis.height;
    Some((x, y, depth))
}
