//! Ambient occlusion data structures

/// Azimuthal strata per hemisphere
pub const DEFAULT_AO_SAMPLES_X: u32 = 20;

/// Elevation strata per hemisphere
pub const DEFAULT_AO_SAMPLES_Y: u32 = 10;

/// Vertices evaluated between two progress polls
pub const DEFAULT_AO_BATCH_SIZE: usize = 4096;

/// Parameters of an AO pass
#[derive(Debug, Clone, PartialEq)]
pub struct AoSettings {
    pub sample_count_x: u32,
    pub sample_count_y: u32,

    /// Distance rays start above the surface. `None` picks a small fraction of
    /// the scene diagonal.
    pub offset: Option<f32>,

    pub seed: u64,
    pub batch_size: usize,
}

impl Default for AoSettings {
    fn default() -> Self {
        Self {
            sample_count_x: DEFAULT_AO_SAMPLES_X,
            sample_count_y: DEFAULT_AO_SAMPLES_Y,
            offset: None,
            seed: 0,
            batch_size: DEFAULT_AO_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AoStatus {
    Completed,
    /// Stopped early. Meshes finished before the stop carry fresh values, the
    /// rest are unchanged.
    Cancelled,
}
