//! Emulated camera for development and tests.
//!
//! Cycles through a fixed set of pre-loaded JPEG frames, switching once
//! per wall-clock second. The selected frame is a pure function of time,
//! so every caller within the same second sees the same image.

use super::source::{CameraError, FrameSource};
use bytes::Bytes;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Built-in 8x8 grayscale frames (dark, mid grey, light).
const BUILTIN_FRAMES: [&[u8]; 3] = [
    include_bytes!("../../assets/frames/1.jpg"),
    include_bytes!("../../assets/frames/2.jpg"),
    include_bytes!("../../assets/frames/3.jpg"),
];

/// Source of "now" in whole seconds.
pub type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Synthetic camera serving a repeated sequence of stills.
pub struct SyntheticCamera {
    frames: Mutex<Vec<Bytes>>,
    clock: Clock,
    frame_delay: Duration,
}

impl SyntheticCamera {
    /// Creates a camera over the given frames.
    pub fn new(frames: Vec<Bytes>) -> Result<Self, CameraError> {
        if frames.is_empty() {
            return Err(CameraError::NoFrames);
        }
        Ok(Self {
            frames: Mutex::new(frames),
            clock: Box::new(wall_clock_secs),
            frame_delay: Duration::ZERO,
        })
    }

    /// Creates a camera over the three built-in frames.
    pub fn builtin() -> Self {
        Self {
            frames: Mutex::new(BUILTIN_FRAMES.into_iter().map(Bytes::from_static).collect()),
            clock: Box::new(wall_clock_secs),
            frame_delay: Duration::ZERO,
        }
    }

    /// Loads every frame from disk up front.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, CameraError> {
        let frames = paths
            .iter()
            .map(|p| std::fs::read(p.as_ref()).map(Bytes::from))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(count = frames.len(), "Loaded synthetic frames");
        Self::new(frames)
    }

    /// Replaces the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Simulates capture latency; the delay is spent holding the lock.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }
}

impl FrameSource for SyntheticCamera {
    fn get_frame(&self) -> Result<Bytes, CameraError> {
        let frames = self
            .frames
            .lock()
            .map_err(|_| CameraError::Hardware("synthetic camera lock poisoned".into()))?;
        if frames.is_empty() {
            return Err(CameraError::NoFrames);
        }
        if !self.frame_delay.is_zero() {
            std::thread::sleep(self.frame_delay);
        }
        let index = ((self.clock)() % frames.len() as u64) as usize;
        Ok(frames[index].clone())
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
