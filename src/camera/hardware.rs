//! Exclusive hardware camera.
//!
//! The physical device may only be opened once and cannot serve two
//! captures at a time. [`HardwareCamera`] owns the device behind a single
//! mutex that covers both the lazy enable and the capture, so concurrent
//! callers queue up instead of tripping a hardware fault.

use super::source::{CameraError, FrameSource};
use bytes::Bytes;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

/// Low-level camera device driven by [`HardwareCamera`].
pub trait CameraDevice: Send {
    /// Acquires the device. Fails if it is busy or already enabled elsewhere.
    fn open(&mut self) -> Result<(), CameraError>;

    /// Checks whether the device is currently acquired.
    fn is_open(&self) -> bool;

    /// Captures one JPEG frame from an open device.
    fn capture(&mut self) -> Result<Bytes, CameraError>;

    /// Releases the device. Safe to call on a closed device.
    fn close(&mut self);
}

/// Lifecycle of the hardware device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// Device released.
    Disabled,
    /// Device is being acquired.
    Enabling,
    /// Device acquired and kept open across captures.
    Enabled,
}

impl CameraState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CameraState::Enabling,
            2 => CameraState::Enabled,
            _ => CameraState::Disabled,
        }
    }
}

/// Frame source backed by an exclusive physical device.
pub struct HardwareCamera<D> {
    device: Mutex<D>,
    state: AtomicU8,
}

impl<D: CameraDevice> HardwareCamera<D> {
    /// Wraps a device. The device stays closed until the first frame is requested.
    pub fn new(device: D) -> Self {
        Self {
            device: Mutex::new(device),
            state: AtomicU8::new(CameraState::Disabled as u8),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CameraState {
        CameraState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: CameraState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Opens the device if needed. The caller holds the device lock.
    fn enable(&self, device: &mut D) -> Result<(), CameraError> {
        if device.is_open() {
            self.set_state(CameraState::Enabled);
            return Ok(());
        }

        self.set_state(CameraState::Enabling);
        match device.open() {
            Ok(()) => {
                self.set_state(CameraState::Enabled);
                tracing::info!("Camera enabled");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to enable camera, closing device");
                device.close();
                self.set_state(CameraState::Disabled);
                Err(match e {
                    CameraError::Hardware(_) => e,
                    other => CameraError::Hardware(other.to_string()),
                })
            }
        }
    }
}

impl<D: CameraDevice> FrameSource for HardwareCamera<D> {
    fn get_frame(&self) -> Result<Bytes, CameraError> {
        let mut device = self
            .device
            .lock()
            .map_err(|_| CameraError::Hardware("camera lock poisoned".into()))?;
        self.enable(&mut device)?;
        device.capture()
    }

    fn close(&self) {
        match self.device.lock() {
            Ok(mut device) => {
                device.close();
                self.set_state(CameraState::Disabled);
                tracing::info!("Camera closed");
            }
            Err(_) => tracing::warn!("Camera lock poisoned, device left as is"),
        }
    }

    fn name(&self) -> &'static str {
        "hardware"
    }
}
