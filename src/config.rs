//! Render settings
//!
//! User-facing settings for the render and AO passes, stored as TOML.
//! Missing keys fall back to the defaults below.

use crate::ambient_occlusion::{AoSettings, DEFAULT_AO_BATCH_SIZE, DEFAULT_AO_SAMPLES_X, DEFAULT_AO_SAMPLES_Y};
use crate::camera::CameraData;
use crate::error::{ViewerError, ViewerResult};
use crate::renderer::{
    create_render_view, RenderOptions, RenderView, RenderWire, ShadingMode, DEFAULT_BAND_HEIGHT,
    DEFAULT_WIRE_COLOR,
};
use cgmath::{InnerSpace, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported viewport edge
pub const MAX_VIEWPORT_SIZE: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    // Sun
    /// Degrees around +Y, measured from +X towards +Z
    pub sun_azimuth_degrees: f32,
    /// Degrees above the horizon
    pub sun_elevation_degrees: f32,

    // Display
    pub exposure: f32,
    pub gamma: f32,
    pub background: [f32; 3],

    // Viewport
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub fov_degrees: f32,

    // Render pass
    pub wire: RenderWire,
    pub shading: ShadingMode,
    pub samples_per_pixel: u32,
    pub band_height: u32,
    pub shadows: bool,
    pub ambient: f32,
    pub wire_color: [f32; 3],
    pub seed: u64,

    // Ambient occlusion
    pub ao_samples_x: u32,
    pub ao_samples_y: u32,
    pub ao_offset: Option<f32>,

    /// Worker threads for both passes
    pub worker_threads: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sun_azimuth_degrees: 135.0,
            sun_elevation_degrees: 45.0,
            exposure: 1.0,
            gamma: 2.2,
            background: [0.18, 0.18, 0.2],
            viewport_width: 800,
            viewport_height: 600,
            fov_degrees: 45.0,
            wire: RenderWire::Nothing,
            shading: ShadingMode::Textured,
            samples_per_pixel: 1,
            band_height: DEFAULT_BAND_HEIGHT,
            shadows: true,
            ambient: 0.0,
            wire_color: DEFAULT_WIRE_COLOR,
            seed: 0,
            ao_samples_x: DEFAULT_AO_SAMPLES_X,
            ao_samples_y: DEFAULT_AO_SAMPLES_Y,
            ao_offset: None,
            worker_threads: num_cpus::get(),
        }
    }
}

impl RenderSettings {
    /// Validate every field, reporting the first offending one
    pub fn validate(&self) -> ViewerResult<()> {
        if !(-90.0..=90.0).contains(&self.sun_elevation_degrees) {
            return Err(ViewerError::invalid_config(
                "sun_elevation_degrees",
                self.sun_elevation_degrees,
                "must be between -90 and 90",
            ));
        }
        if !self.sun_azimuth_degrees.is_finite() {
            return Err(ViewerError::invalid_config(
                "sun_azimuth_degrees",
                self.sun_azimuth_degrees,
                "must be finite",
            ));
        }

        if !(self.exposure.is_finite() && self.exposure >= 0.0) {
            return Err(ViewerError::invalid_config("exposure", self.exposure, "must be non-negative"));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(ViewerError::invalid_config("gamma", self.gamma, "must be positive"));
        }
        for (field, color) in [("background", self.background), ("wire_color", self.wire_color)] {
            if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(ViewerError::invalid_config(
                    field,
                    format!("{:?}", color),
                    "channels must be between 0 and 1",
                ));
            }
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ViewerError::invalid_config(
                "viewport",
                format!("{}x{}", self.viewport_width, self.viewport_height),
                "must not be empty",
            ));
        }
        if self.viewport_width > MAX_VIEWPORT_SIZE || self.viewport_height > MAX_VIEWPORT_SIZE {
            return Err(ViewerError::invalid_config(
                "viewport",
                format!("{}x{}", self.viewport_width, self.viewport_height),
                "exceeds 16384x16384",
            ));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ViewerError::invalid_config(
                "fov_degrees",
                self.fov_degrees,
                "must be between 0 and 180 exclusive",
            ));
        }

        if self.samples_per_pixel == 0 {
            return Err(ViewerError::invalid_config("samples_per_pixel", 0, "must be at least 1"));
        }
        if self.band_height == 0 {
            return Err(ViewerError::invalid_config("band_height", 0, "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.ambient) {
            return Err(ViewerError::invalid_config("ambient", self.ambient, "must be between 0 and 1"));
        }

        if self.ao_samples_x == 0 || self.ao_samples_y == 0 {
            return Err(ViewerError::invalid_config(
                "ao_samples",
                format!("{}x{}", self.ao_samples_x, self.ao_samples_y),
                "both counts must be at least 1",
            ));
        }
        if self.ao_samples_x.checked_mul(self.ao_samples_y).is_none() {
            return Err(ViewerError::invalid_config(
                "ao_samples",
                format!("{}x{}", self.ao_samples_x, self.ao_samples_y),
                "direction count overflows",
            ));
        }
        if let Some(offset) = self.ao_offset {
            if !(offset.is_finite() && offset >= 0.0) {
                return Err(ViewerError::invalid_config("ao_offset", offset, "must be non-negative"));
            }
        }
        if self.worker_threads == 0 {
            return Err(ViewerError::invalid_config("worker_threads", 0, "must be at least 1"));
        }

        log::debug!("[RenderSettings] Configuration validated successfully");
        Ok(())
    }

    /// Unit vector pointing towards the sun
    pub fn sun_direction(&self) -> Vector3<f32> {
        let azimuth = self.sun_azimuth_degrees.to_radians();
        let elevation = self.sun_elevation_degrees.to_radians();
        Vector3::new(
            elevation.cos() * azimuth.cos(),
            elevation.sin(),
            elevation.cos() * azimuth.sin(),
        )
        .normalize()
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            shading: self.shading,
            samples_per_pixel: self.samples_per_pixel,
            band_height: self.band_height,
            shadows: self.shadows,
            ambient: self.ambient,
            wire_color: self.wire_color.into(),
            seed: self.seed,
        }
    }

    pub fn ao_settings(&self) -> AoSettings {
        AoSettings {
            sample_count_x: self.ao_samples_x,
            sample_count_y: self.ao_samples_y,
            offset: self.ao_offset,
            seed: self.seed,
            batch_size: DEFAULT_AO_BATCH_SIZE,
        }
    }

    /// View for `camera` lit and shaded according to these settings
    pub fn render_view(&self, camera: CameraData) -> ViewerResult<RenderView> {
        create_render_view(camera, self.sun_direction(), self.wire, self.render_options())
    }
}

/// Read settings from a TOML file and validate them
pub fn load_settings(path: &Path) -> ViewerResult<RenderSettings> {
    let text = std::fs::read_to_string(path).map_err(|e| ViewerError::ConfigLoad {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let settings: RenderSettings = toml::from_str(&text).map_err(|e| ViewerError::ConfigLoad {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    settings.validate()?;

    log::info!("[RenderSettings::load] Loaded settings from {}", path.display());
    Ok(settings)
}

pub fn save_settings(settings: &RenderSettings, path: &Path) -> ViewerResult<()> {
    let text = toml::to_string_pretty(settings).map_err(|e| ViewerError::ConfigSave {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|e| ViewerError::ConfigSave {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    log::info!("[RenderSettings::save] Saved settings to {}", path.display());
    Ok(())
}
