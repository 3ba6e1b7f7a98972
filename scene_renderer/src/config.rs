// config.rs - Scene constants, overridable from a JSON file

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error_handling::{RendererError, Result};

/// One sine oscillation: `sin(t * frequency) * amplitude`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub frequency: f32,
    pub amplitude: f32,
}

impl Oscillation {
    pub const fn new(frequency: f32, amplitude: f32) -> Self {
        Self { frequency, amplitude }
    }

    #[inline]
    pub fn sample(&self, time: f32) -> f32 {
        (time * self.frequency).sin() * self.amplitude
    }
}

/// Idle camera drift around the rest position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDrift {
    pub x: Oscillation,
    pub y: Oscillation,
    pub z: Oscillation,
    pub roll: Oscillation,
}

impl Default for CameraDrift {
    fn default() -> Self {
        Self {
            x: Oscillation::new(0.3, 0.5),
            y: Oscillation::new(0.5, 0.24),
            z: Oscillation::new(0.15, 2.0),
            roll: Oscillation::new(0.25, 0.1),
        }
    }
}

/// Everything the skull scene needs to know that isn't in the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory the asset paths are resolved against
    pub asset_root: PathBuf,
    pub environment_path: String,
    pub model_path: String,

    pub camera_fov_degrees: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub camera_distance: f32,
    pub camera_drift: CameraDrift,

    /// Per-frame fraction of the remaining rotation applied to the group
    pub rotation_smoothing: f32,
    /// Full pointer sweep across the container maps to this many radians
    pub pointer_rotation_range: f32,

    pub tone_mapping_exposure: f32,
    pub fog_color: [f32; 3],
    pub fog_near: f32,
    pub fog_far: f32,

    /// Timeline: `progress` reaches this value...
    pub timeline_progress_end: f32,
    /// ...over this many timeline seconds
    pub timeline_progress_duration: f32,
    pub timeline_spin_duration: f32,
    pub timeline_depth_start: f32,
    pub timeline_depth_duration: f32,
    pub timeline_depth_target: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            environment_path: "studio_small_09_1k.hdr".to_string(),
            model_path: "skull2.glb".to_string(),

            camera_fov_degrees: 60.0,
            camera_near: 0.1,
            camera_far: 2000.0,
            camera_distance: 25.0,
            camera_drift: CameraDrift::default(),

            rotation_smoothing: 0.1,
            pointer_rotation_range: 1.6,

            tone_mapping_exposure: 0.75,
            fog_color: hex_to_linear(0x242424),
            fog_near: 25.0,
            fog_far: 40.0,

            timeline_progress_end: 0.5,
            timeline_progress_duration: 2.5,
            timeline_spin_duration: 5.0,
            timeline_depth_start: 1.0,
            timeline_depth_duration: 4.0,
            timeline_depth_target: -50.0,
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| RendererError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn environment_file(&self) -> PathBuf {
        self.asset_root.join(&self.environment_path)
    }

    pub fn model_file(&self) -> PathBuf {
        self.asset_root.join(&self.model_path)
    }
}

/// sRGB hex colour to linear RGB
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}
