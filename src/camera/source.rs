//! Frame source abstraction.
//!
//! A frame source produces one JPEG-encoded still per call. Exactly one
//! source is constructed per process and shared by the streaming path and
//! the capture scheduler, so implementations take `&self` and serialize
//! access internally.

use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while acquiring a frame.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The device could not be acquired (busy, missing, already enabled).
    #[error("camera hardware unavailable: {0}")]
    Hardware(String),
    /// The device was acquired but reading a frame failed.
    #[error("camera read failed: {0}")]
    Io(#[from] std::io::Error),
    /// A synthetic source was configured without any frames.
    #[error("no frames available for synthetic camera")]
    NoFrames,
}

/// Trait for anything that can hand out still frames.
///
/// Callers on different threads may call `get_frame` at the same time;
/// implementations block the later caller until the current capture
/// completes rather than failing it.
pub trait FrameSource: Send + Sync {
    /// Captures one JPEG frame.
    fn get_frame(&self) -> Result<Bytes, CameraError>;

    /// Releases the underlying device, if any.
    fn close(&self) {}

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
