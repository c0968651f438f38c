//! Prometheus metrics for capture and streaming.
//!
//! # Metrics Exposed
//!
//! ## Capture Metrics
//! - `picamera_captures_total` - Captures persisted
//! - `picamera_capture_failures_total` - Captures that failed
//! - `picamera_capturing` - Capture mode status (1=capturing, 0=stopped)
//! - `picamera_capture_interval_seconds` - Current capture interval
//! - `picamera_stored_captures` - Captures currently stored
//!
//! ## Streaming Metrics
//! - `picamera_stream_clients` - Connected MJPEG clients
//! - `picamera_frames_streamed_total` - Frames sent to stream clients
//!
//! Counters are updated as events happen; the state gauges are refreshed
//! from a [`MetricsSnapshot`] whenever `/metrics` is scraped.

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
