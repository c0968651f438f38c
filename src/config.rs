//! Server configuration file.
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! [camera]
//! source = "hardware"
//! width = 1280
//! height = 720
//!
//! [capture]
//! default_interval = 60
//! captures_dir = "captures"
//! database = "captures.db"
//! on_failure = "stop"
//!
//! [server]
//! bind_addr = "0.0.0.0:8080"
//! items_per_page = 20
//! ```

use crate::camera::{CameraConfig, CameraConfigError};
use crate::capture::{FailurePolicy, IntervalBounds, DEFAULT_CAPTURE_INTERVAL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Camera(#[from] CameraConfigError),
    #[error("default capture interval {value} outside {min}..={max}")]
    InvalidInterval { value: u64, min: u64, max: u64 },
    #[error("items per page must be at least 1")]
    InvalidPageSize,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Capture scheduler and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interval in seconds the scheduler starts with.
    pub default_interval: u64,
    /// Root directory for capture files.
    pub captures_dir: PathBuf,
    /// SQLite catalog file.
    pub database: PathBuf,
    /// What the capture loop does after a failed capture.
    pub on_failure: FailurePolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_CAPTURE_INTERVAL,
            captures_dir: PathBuf::from("captures"),
            database: PathBuf::from("captures.db"),
            on_failure: FailurePolicy::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Page size of the captures listing.
    pub items_per_page: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8080).into(),
            items_per_page: 20,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Frame source settings.
    #[serde(default)]
    pub camera: CameraConfig,
    /// Capture scheduler and storage settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;

        let bounds = IntervalBounds::default();
        if !bounds.contains(self.capture.default_interval) {
            return Err(ConfigError::InvalidInterval {
                value: self.capture.default_interval,
                min: bounds.min,
                max: bounds.max,
            });
        }
        if self.server.items_per_page == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SourceKind;

    #[test]
    fn test_default_config_valid() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
            [camera]
            source = "hardware"

            [capture]
            on_failure = "continue"
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.source, SourceKind::Hardware);
        assert_eq!(config.camera.command, "libcamera-vid");
        assert_eq!(config.capture.on_failure, FailurePolicy::Continue);
        assert_eq!(config.capture.default_interval, 60);
        assert_eq!(config.server.bind_addr.port(), 8080);
    }

    #[test]
    fn test_interval_out_of_range_invalid() {
        let mut config = FileConfig::default();
        config.capture.default_interval = 601;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidInterval { value: 601, .. })
        ));
    }

    #[test]
    fn test_zero_page_size_invalid() {
        let mut config = FileConfig::default();
        config.server.items_per_page = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPageSize)));
    }

    #[test]
    fn test_camera_section_validated() {
        let mut config = FileConfig::default();
        config.camera.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Camera(CameraConfigError::InvalidDimensions))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picamera.toml");
        std::fs::write(&path, "[server]\nbind_addr = \"127.0.0.1:9000\"\n").unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.server.bind_addr.port(), 9000);

        assert!(matches!(
            FileConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::FileReadError(_))
        ));

        std::fs::write(&path, "[capture]\ndefault_interval = \"soon\"\n").unwrap();
        assert!(matches!(FileConfig::from_file(&path), Err(ConfigError::ParseError(_))));
    }
}
