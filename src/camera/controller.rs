//! Process-wide camera owner.
//!
//! [`CameraController`] is built once at startup around the single frame
//! source and handed to both the streaming path and the capture
//! scheduler, so they share one device handle.

use super::source::{CameraError, FrameSource};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Boundary marker between frames of the MJPEG stream.
pub const MULTIPART_BOUNDARY: &str = "frame";

/// Content type of the MJPEG stream response.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// Wraps a JPEG frame in its multipart envelope.
pub fn multipart_chunk(frame: &[u8]) -> Bytes {
    let mut chunk = BytesMut::with_capacity(PART_HEADER.len() + frame.len() + PART_TRAILER.len());
    chunk.put_slice(PART_HEADER);
    chunk.put_slice(frame);
    chunk.put_slice(PART_TRAILER);
    chunk.freeze()
}

/// Shared handle to the active frame source.
#[derive(Clone)]
pub struct CameraController {
    source: Arc<dyn FrameSource>,
}

impl CameraController {
    /// Takes ownership of the process' frame source.
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        tracing::info!(source = source.name(), "Camera controller ready");
        Self { source }
    }

    /// Captures one frame, blocking while another caller holds the camera.
    pub fn get_frame(&self) -> Result<Bytes, CameraError> {
        self.source.get_frame()
    }

    /// Starts a fresh multipart frame sequence for one stream consumer.
    pub fn frames(&self) -> MultipartFrames {
        MultipartFrames {
            source: Arc::clone(&self.source),
        }
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Releases the camera device.
    pub fn close(&self) {
        self.source.close();
    }
}

/// Infinite sequence of multipart-encoded frames.
///
/// Every `next` blocks on a capture. The sequence never ends on its own;
/// the consumer stops pulling when its client goes away. A camera fault is
/// yielded as an error item and the consumer decides whether to continue.
pub struct MultipartFrames {
    source: Arc<dyn FrameSource>,
}

impl Iterator for MultipartFrames {
    type Item = Result<Bytes, CameraError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.source.get_frame().map(|frame| multipart_chunk(&frame)))
    }
}
