//! Camera access.
//!
//! This module provides the frame source abstraction, its synthetic and
//! hardware implementations, and the controller that shares the single
//! source between streaming clients and the capture scheduler.

mod config;
mod controller;
mod hardware;
mod libcamera;
mod source;
mod synthetic;

pub use config::{CameraConfig, CameraConfigError, SourceKind};
pub use controller::{
    multipart_chunk, CameraController, MultipartFrames, MULTIPART_BOUNDARY,
    MULTIPART_CONTENT_TYPE,
};
pub use hardware::{CameraDevice, CameraState, HardwareCamera};
pub use libcamera::{JpegSplitter, LibcameraDevice};
pub use source::{CameraError, FrameSource};
pub use synthetic::SyntheticCamera;

use std::sync::Arc;
use std::time::Duration;

/// Constructs the process' frame source from the explicit configuration.
///
/// Called once at startup; the returned handle is the only instance.
pub fn open_source(config: &CameraConfig) -> Result<Arc<dyn FrameSource>, CameraError> {
    let source: Arc<dyn FrameSource> = match config.source {
        SourceKind::Synthetic => {
            let camera = if config.frames.is_empty() {
                SyntheticCamera::builtin()
            } else {
                SyntheticCamera::from_files(&config.frames)?
            };
            Arc::new(camera.with_frame_delay(Duration::from_millis(config.frame_delay_ms)))
        }
        SourceKind::Hardware => {
            Arc::new(HardwareCamera::new(LibcameraDevice::from_config(config)))
        }
    };
    tracing::info!(source = %config.source, "Frame source selected");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_synthetic_source() {
        let source = open_source(&CameraConfig::default()).unwrap();
        assert_eq!(source.name(), "synthetic");
        assert!(source.get_frame().is_ok());
    }

    #[test]
    fn test_open_hardware_source_is_lazy() {
        let config = CameraConfig {
            source: SourceKind::Hardware,
            command: "/nonexistent/libcamera-vid".into(),
            ..CameraConfig::default()
        };
        let source = open_source(&config).unwrap();
        assert_eq!(source.name(), "hardware");
        assert!(matches!(source.get_frame(), Err(CameraError::Hardware(_))));
    }
}
