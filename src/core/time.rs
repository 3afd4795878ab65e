//! Time windows and time reference handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate convention applied to returned timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeReference {
    /// Store-native data time
    Absolute,
    /// Segment start is time zero
    #[default]
    Zero,
}

impl fmt::Display for TimeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Zero => write!(f, "zero"),
        }
    }
}

/// Time interval of a segment, in seconds of data time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: f64,
    duration: f64,
}

impl TimeWindow {
    /// Create a window from start time and duration
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// Start time
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Duration, may be zero or (for interrupted recordings) negative
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Stop time
    pub fn stop(&self) -> f64 {
        self.start + self.duration
    }

    /// A window is invalid if it stops before it starts
    pub fn is_valid(&self) -> bool {
        self.stop() >= self.start
    }

    /// Window extended by `before` seconds at the front and `after` at the back
    pub fn padded(&self, before: f64, after: f64) -> Self {
        Self {
            start: self.start - before,
            duration: self.duration + before + after,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.5}, {:.5})", self.start, self.stop())
    }
}

/// Upper bounds for the padding a caller may request around a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddingLimits {
    /// Maximum time that may be read before segment start
    pub max_before: f64,
    /// Maximum time that may be read after segment stop
    pub max_after: f64,
}

impl PaddingLimits {
    /// Create padding limits
    pub fn new(max_before: f64, max_after: f64) -> Self {
        Self {
            max_before,
            max_after,
        }
    }

    /// No limits in either direction
    pub fn unbounded() -> Self {
        Self {
            max_before: f64::INFINITY,
            max_after: f64::INFINITY,
        }
    }

    /// Reduce requested padding to the limits, returns (before, after)
    pub fn apply(&self, before: f64, after: f64) -> (f64, f64) {
        let before = if before > 0.0 && before > self.max_before {
            self.max_before
        } else {
            before
        };
        let after = if after > 0.0 && after > self.max_after {
            self.max_after
        } else {
            after
        };
        (before, after)
    }
}

impl Default for PaddingLimits {
    fn default() -> Self {
        Self::unbounded()
    }
}
