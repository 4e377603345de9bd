/// Camera Module
///
/// - camera_data.rs: plain data structures
/// - camera_operations.rs: pure functions that operate on them

pub mod camera_data;
pub mod camera_operations;

pub use camera_data::{CameraBasis, CameraData};

pub use camera_operations::{
    // Initialization
    create_camera,
    look_at,
    validate_camera,

    // Projection
    camera_basis,
    generate_ray,
    project_point,
};
