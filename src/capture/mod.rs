//! Timed capture.
//!
//! This module provides the interval settings and validation for capture
//! mode, and the scheduler that runs the background capture loop.

mod scheduler;
mod settings;

pub use scheduler::{
    CaptureError, CaptureScheduler, CaptureSchedulerBuilder, CaptureStatus, SchedulerError,
};
pub use settings::{
    parse_capturing, parse_interval, FailurePolicy, IntervalBounds, InvalidArgument,
    DEFAULT_CAPTURE_INTERVAL, MAX_CAPTURE_INTERVAL, MIN_CAPTURE_INTERVAL,
};
