//! Raspberry Pi Camera Server Library
//!
//! Live MJPEG streaming and timed still captures from a single camera.
//! Captures are written to disk, one folder per day, and catalogued in
//! SQLite so they can be listed and filtered by date.
//!
//! # Architecture
//!
//! ```text
//! FrameSource ─→ CameraController ─┬─→ MJPEG stream (server)
//!                                  └─→ CaptureScheduler ─→ CaptureStore
//!                                                            ├─ FileStore
//!                                                            └─ Catalog
//! ```
//!
//! One frame source exists per process. The stream and the scheduler
//! share it through the controller, and the source serializes access to
//! the device.
//!
//! # Example
//!
//! ```no_run
//! use picamera_server::{
//!     camera::{CameraController, SyntheticCamera},
//!     capture::CaptureScheduler,
//!     storage::CaptureStore,
//! };
//! use std::sync::Arc;
//!
//! let camera = CameraController::new(Arc::new(SyntheticCamera::builtin()));
//! let store = Arc::new(CaptureStore::open("captures", "captures.db").unwrap());
//! let scheduler = CaptureScheduler::builder(camera, store)
//!     .interval(5)
//!     .build()
//!     .unwrap();
//!
//! scheduler.set_capturing(true).unwrap();
//! // ...
//! scheduler.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod capture;
pub mod config;
pub mod metrics;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

// Re-export commonly used types at crate root
pub use camera::{CameraController, CameraError, FrameSource, HardwareCamera, SyntheticCamera};
pub use capture::{CaptureScheduler, CaptureStatus, FailurePolicy, SchedulerError};
pub use config::FileConfig;
pub use metrics::MetricsRegistry;
pub use storage::{CaptureStore, CapturedImage, SqliteCatalog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
