//! Capture interval bounds and form-value parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Smallest accepted capture interval in seconds.
pub const MIN_CAPTURE_INTERVAL: u64 = 0;
/// Largest accepted capture interval in seconds.
pub const MAX_CAPTURE_INTERVAL: u64 = 600;
/// Interval used when nothing else is configured.
pub const DEFAULT_CAPTURE_INTERVAL: u64 = 60;

/// A form value that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Form argument {field} is required and must be an integer between {min} and {max}. Value received: {received}"
)]
pub struct InvalidArgument {
    /// Name of the offending form field.
    pub field: &'static str,
    /// Lower bound, inclusive.
    pub min: u64,
    /// Upper bound, inclusive.
    pub max: u64,
    /// The raw value as received.
    pub received: String,
}

/// Inclusive range of accepted capture intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalBounds {
    /// Lower bound in seconds.
    pub min: u64,
    /// Upper bound in seconds.
    pub max: u64,
}

impl Default for IntervalBounds {
    fn default() -> Self {
        Self {
            min: MIN_CAPTURE_INTERVAL,
            max: MAX_CAPTURE_INTERVAL,
        }
    }
}

impl IntervalBounds {
    /// Whether `seconds` lies within the bounds.
    pub fn contains(&self, seconds: u64) -> bool {
        (self.min..=self.max).contains(&seconds)
    }

    /// Checks an already-numeric interval.
    pub fn check(&self, seconds: u64) -> Result<u64, InvalidArgument> {
        if self.contains(seconds) {
            Ok(seconds)
        } else {
            Err(self.reject(seconds.to_string()))
        }
    }

    fn reject(&self, received: String) -> InvalidArgument {
        InvalidArgument {
            field: "capture_interval",
            min: self.min,
            max: self.max,
            received,
        }
    }
}

/// Parses a `capture_interval` form value.
///
/// Only plain ASCII digits are accepted: no sign, no whitespace, no
/// decimal point. Out-of-range values are rejected, never clamped.
pub fn parse_interval(raw: &str, bounds: IntervalBounds) -> Result<u64, InvalidArgument> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bounds.reject(raw.to_string()));
    }
    let seconds = raw
        .parse::<u64>()
        .map_err(|_| bounds.reject(raw.to_string()))?;
    if !bounds.contains(seconds) {
        return Err(bounds.reject(raw.to_string()));
    }
    Ok(seconds)
}

/// Parses a capture-mode `status` form value.
pub fn parse_capturing(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// What the capture loop does after a failed capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// End the session and clear the capturing flag.
    #[default]
    Stop,
    /// Log the failure and wait for the next tick.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Stop => write!(f, "stop"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}
