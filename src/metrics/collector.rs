//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of capture state for the gauges refreshed at scrape time.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether capture mode is on.
    pub capturing: bool,
    /// Current capture interval in seconds.
    pub interval_seconds: u64,
    /// Captures currently stored.
    pub stored_captures: u64,
}

/// Prometheus metrics registry for the camera server.
///
/// Cloning is cheap; every clone updates the same metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    // Capture metrics
    captures_total: IntCounter,
    capture_failures_total: IntCounter,
    capturing: IntGauge,
    interval_seconds: IntGauge,
    stored_captures: IntGauge,

    // Streaming metrics
    stream_clients: IntGauge,
    frames_streamed_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all camera metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let captures_total = IntCounter::new(
            "picamera_captures_total",
            "Total number of captures persisted",
        )?;
        let capture_failures_total = IntCounter::new(
            "picamera_capture_failures_total",
            "Total number of captures that failed",
        )?;
        let capturing = IntGauge::new(
            "picamera_capturing",
            "Capture mode status (1=capturing, 0=stopped)",
        )?;
        let interval_seconds = IntGauge::new(
            "picamera_capture_interval_seconds",
            "Seconds between scheduled captures",
        )?;
        let stored_captures = IntGauge::new(
            "picamera_stored_captures",
            "Number of captures currently stored",
        )?;

        let stream_clients = IntGauge::new(
            "picamera_stream_clients",
            "Number of connected MJPEG stream clients",
        )?;
        let frames_streamed_total = IntCounter::new(
            "picamera_frames_streamed_total",
            "Total number of frames sent to stream clients",
        )?;

        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures_total.clone()))?;
        registry.register(Box::new(capturing.clone()))?;
        registry.register(Box::new(interval_seconds.clone()))?;
        registry.register(Box::new(stored_captures.clone()))?;
        registry.register(Box::new(stream_clients.clone()))?;
        registry.register(Box::new(frames_streamed_total.clone()))?;

        Ok(Self {
            registry,
            captures_total,
            capture_failures_total,
            capturing,
            interval_seconds,
            stored_captures,
            stream_clients,
            frames_streamed_total,
        })
    }

    /// Counts a persisted capture.
    pub fn capture_succeeded(&self) {
        self.captures_total.inc();
    }

    /// Counts a failed capture.
    pub fn capture_failed(&self) {
        self.capture_failures_total.inc();
    }

    /// Counts a newly connected stream client.
    pub fn stream_opened(&self) {
        self.stream_clients.inc();
    }

    /// Counts a disconnected stream client.
    pub fn stream_closed(&self) {
        self.stream_clients.dec();
    }

    /// Counts a frame delivered to a stream client.
    pub fn frame_streamed(&self) {
        self.frames_streamed_total.inc();
    }

    /// Updates the state gauges from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.capturing.set(if snapshot.capturing { 1 } else { 0 });
        self.interval_seconds
            .set(i64::try_from(snapshot.interval_seconds).unwrap_or(i64::MAX));
        self.stored_captures
            .set(i64::try_from(snapshot.stored_captures).unwrap_or(i64::MAX));
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        registry.update(&MetricsSnapshot {
            capturing: true,
            interval_seconds: 30,
            stored_captures: 12,
        });
        registry.capture_succeeded();
        registry.capture_succeeded();
        registry.capture_failed();

        let output = registry.encode().unwrap();
        assert!(output.contains("picamera_capturing 1"));
        assert!(output.contains("picamera_capture_interval_seconds 30"));
        assert!(output.contains("picamera_stored_captures 12"));
        assert!(output.contains("picamera_captures_total 2"));
        assert!(output.contains("picamera_capture_failures_total 1"));
    }

    #[test]
    fn test_clones_share_counters() {
        let registry = MetricsRegistry::new().unwrap();
        let clone = registry.clone();

        clone.stream_opened();
        clone.frame_streamed();

        let output = registry.encode().unwrap();
        assert!(output.contains("picamera_stream_clients 1"));
        assert!(output.contains("picamera_frames_streamed_total 1"));
    }
}
