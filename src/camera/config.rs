//! Camera configuration.
//!
//! The frame source is chosen explicitly here and decided once at
//! startup. A missing camera library never silently selects the
//! synthetic source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which frame source to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Pre-loaded stills cycling once per second.
    #[default]
    Synthetic,
    /// The physical camera through `libcamera-vid`.
    Hardware,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Synthetic => f.write_str("synthetic"),
            SourceKind::Hardware => f.write_str("hardware"),
        }
    }
}

/// Configuration for the frame source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Source selection.
    pub source: SourceKind,
    /// Frames for the synthetic source. Empty selects the built-in set.
    pub frames: Vec<PathBuf>,
    /// Simulated capture latency of the synthetic source in milliseconds.
    pub frame_delay_ms: u64,
    /// Camera binary for the hardware source.
    pub command: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second requested from the sensor.
    pub framerate: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            frames: Vec::new(),
            frame_delay_ms: 0,
            command: "libcamera-vid".to_string(),
            width: 1280,
            height: 720,
            framerate: 15,
        }
    }
}

impl CameraConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), CameraConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraConfigError::InvalidDimensions);
        }
        if self.framerate == 0 || self.framerate > 120 {
            return Err(CameraConfigError::InvalidFrameRate);
        }
        if self.source == SourceKind::Hardware && self.command.trim().is_empty() {
            return Err(CameraConfigError::MissingCommand);
        }
        Ok(())
    }
}

/// Camera configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CameraConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("hardware camera requires a command")]
    MissingCommand,
}
