//! Run configuration. Every section uses `#[serde(default)]`, so a partial TOML
//! file only overrides the values it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Float, Result};
use crate::imageio::FormatFallback;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov: Float,
    /// Samples per pixel accumulated before the image is frozen.
    pub samples: u32,
    /// Seed for the per-frame random seeds; taken from entropy when absent.
    pub seed: Option<u64>,
    pub camera: CameraConfig,
    pub backend: BackendConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [Float; 3],
    pub yaw: Float,
    pub pitch: Float,
    pub speed: Float,
    pub sensitivity: Float,
}

/// Uniforms handed to the backend once at setup; opaque to the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub russian_roulette: Float,
    pub indirect_light_rate: Float,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: String,
    pub fallback: FormatFallback,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 784,
            height: 784,
            fov: 40.0,
            samples: 16,
            seed: None,
            camera: CameraConfig::default(),
            backend: BackendConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [278.0, 273.0, -800.0],
            yaw: 0.0,
            pitch: 0.0,
            speed: 100.0,
            sensitivity: 0.1,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            russian_roulette: 0.8,
            indirect_light_rate: 1.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("result.ppm"),
            format: "ppm".to_string(),
            fallback: FormatFallback::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&contents)
    }

    pub fn aspect_ratio(&self) -> Float {
        self.width as Float / self.height as Float
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "resolution must be non-zero, got {}x{}", self.width, self.height
            )));
        }
        if self.samples == 0 {
            return Err(Error::InvalidConfig("sample count must be at least 1".to_string()));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(Error::InvalidConfig(format!(
                "vertical field of view must be in (0, 180) degrees, got {}", self.fov
            )));
        }
        if !(0.0..=1.0).contains(&self.backend.russian_roulette) {
            return Err(Error::InvalidConfig(format!(
                "russian roulette probability must be in [0, 1], got {}", self.backend.russian_roulette
            )));
        }
        for (name, value) in [("speed", self.camera.speed), ("sensitivity", self.camera.sensitivity)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "camera {} must be positive and finite, got {}", name, value
                )));
            }
        }
        Ok(())
    }
}
