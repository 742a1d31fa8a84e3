use std::{path::Path, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Everything that shapes the grid, the search and the playback.
///
/// Missing fields in a settings file fall back to their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of one grid cell in image pixels
    pub cell_size: u32,
    /// Cells whose centre luma is at least this bright are walkable
    pub brightness_threshold: u8,
    /// Use the 8-connected move set instead of the 4-connected one
    pub allow_diagonal: bool,
    pub animation: AnimationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cell_size: 10,
            brightness_threshold: 128,
            allow_diagonal: true,
            animation: AnimationSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading settings from {}", path.display());

        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cell_size == 0 {
            return Err(Error::Settings("cell_size must be at least 1".to_string()));
        }
        self.animation.validate()
    }
}

/// Playback granularity of the trajectory animator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// Approximate pixel distance covered by one frame
    pub pixels_per_frame: f32,
    /// Wall-clock delay between two frames
    pub frame_interval_ms: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            pixels_per_frame: 4.0,
            frame_interval_ms: 20,
        }
    }
}

impl AnimationSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.pixels_per_frame > 0.0 && self.pixels_per_frame.is_finite()) {
            return Err(Error::Settings(format!(
                "pixels_per_frame must be positive, got {}",
                self.pixels_per_frame
            )));
        }
        Ok(())
    }
}
