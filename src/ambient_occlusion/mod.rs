//! Ambient Occlusion Module
//!
//! Per-vertex sky visibility by stratified cosine-weighted ray sampling.
//!
//! - ao_data.rs: settings and status
//! - ao_operations.rs: the sampling pass

pub mod ao_data;
pub mod ao_operations;

pub use ao_data::{
    AoSettings, AoStatus, DEFAULT_AO_BATCH_SIZE, DEFAULT_AO_SAMPLES_X, DEFAULT_AO_SAMPLES_Y,
};
pub use ao_operations::{ambient_occlusion, ambient_occlusion_with, validate_ao_settings, vertex_visibility};
