//! Raspberry Pi camera driven through `libcamera-vid`.
//!
//! Opening the device starts `libcamera-vid` in MJPEG mode writing to
//! stdout; every capture pulls the next complete JPEG off the pipe. The
//! camera stack only allows one process to hold the sensor, so a second
//! open fails when the child exits before producing its first frame.

use super::config::CameraConfig;
use super::hardware::CameraDevice;
use super::source::CameraError;
use bytes::Bytes;
use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const READ_CHUNK: usize = 16 * 1024;
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits a byte stream of concatenated JPEGs into frames.
///
/// Bytes before a start-of-image marker are skipped. Markers split across
/// reads are handled.
pub struct JpegSplitter<R> {
    reader: R,
    buf: Vec<u8>,
    scanned: usize,
}

impl<R: Read> JpegSplitter<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK * 4),
            scanned: 0,
        }
    }

    /// Reads until one complete frame is buffered and returns it.
    pub fn next_frame(&mut self) -> io::Result<Bytes> {
        loop {
            match find(&self.buf, &SOI) {
                Some(0) => {}
                Some(start) => {
                    self.buf.drain(..start);
                    self.scanned = 0;
                }
                None => {
                    // keep a trailing 0xFF, it may begin a marker
                    let keep = usize::from(self.buf.last() == Some(&0xFF));
                    let drop = self.buf.len() - keep;
                    self.buf.drain(..drop);
                    self.scanned = 0;
                }
            }

            if self.buf.len() >= SOI.len() {
                let from = self.scanned.max(SOI.len());
                if let Some(pos) = find(&self.buf[from..], &EOI) {
                    let end = from + pos + EOI.len();
                    let frame: Vec<u8> = self.buf.drain(..end).collect();
                    self.scanned = 0;
                    return Ok(Bytes::from(frame));
                }
                self.scanned = self.buf.len().saturating_sub(1);
            }

            if self.buf.len() > MAX_FRAME_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "jpeg frame exceeds maximum size",
                ));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match self.reader.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "camera stream ended",
                ));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Camera device backed by a `libcamera-vid` child process.
pub struct LibcameraDevice {
    command: String,
    width: u32,
    height: u32,
    framerate: u32,
    child: Option<Child>,
    frames: Option<JpegSplitter<ChildStdout>>,
}

impl LibcameraDevice {
    /// Creates a closed device from the camera configuration.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            command: config.command.clone(),
            width: config.width,
            height: config.height,
            framerate: config.framerate,
            child: None,
            frames: None,
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--codec".into(),
            "mjpeg".into(),
            "--timeout".into(),
            "0".into(),
            "--nopreview".into(),
            "--width".into(),
            self.width.to_string(),
            "--height".into(),
            self.height.to_string(),
            "--framerate".into(),
            self.framerate.to_string(),
            "--output".into(),
            "-".into(),
        ]
    }
}

impl CameraDevice for LibcameraDevice {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.child.is_some() {
            return Err(CameraError::Hardware("camera already enabled".into()));
        }

        tracing::debug!(command = %self.command, args = ?self.args(), "Starting camera process");
        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CameraError::Hardware(format!("failed to start {}: {}", self.command, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CameraError::Hardware("camera process has no stdout".into()))?;
        self.child = Some(child);
        let mut frames = JpegSplitter::new(stdout);

        // The first frame proves the sensor was acquired.
        if let Err(e) = frames.next_frame() {
            self.close();
            return Err(CameraError::Hardware(format!(
                "{} produced no frames: {}",
                self.command, e
            )));
        }
        self.frames = Some(frames);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.frames.is_some()
    }

    fn capture(&mut self) -> Result<Bytes, CameraError> {
        let frames = self
            .frames
            .as_mut()
            .ok_or_else(|| CameraError::Hardware("camera not enabled".into()))?;
        match frames.next_frame() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                tracing::warn!(error = %e, "Camera stream failed, releasing device");
                self.close();
                Err(CameraError::Io(e))
            }
        }
    }

    fn close(&mut self) {
        self.frames = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for LibcameraDevice {
    fn drop(&mut self) {
        self.close();
    }
}
