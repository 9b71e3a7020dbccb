// Helpers for timestamps and measuring durations
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Helper to get the current time in milliseconds
///
/// This is wall clock time and is only meant for log stamps.
pub fn get_current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Measures the time between `start` and `end`
///
/// Used for profiling the main loop and for the uptime report on exit.
pub struct StopWatch {
    sw_start: Option<Instant>,
    sw_end: Option<Instant>,
}

impl StopWatch {
    pub fn new() -> Self {
        Self {
            sw_start: None,
            sw_end: None,
        }
    }

    pub fn start(&mut self) {
        self.sw_start = Some(Instant::now());
        self.sw_end = None;
    }

    pub fn end(&mut self) {
        self.sw_end = Some(Instant::now());
    }

    /// Get the elapsed time
    ///
    /// If the watch is still running this is the time since `start`.
    /// A watch that was never started reports zero.
    pub fn get_duration(&self) -> Duration {
        match (self.sw_start, self.sw_end) {
            (Some(s), Some(e)) => e.duration_since(s),
            (Some(s), None) => s.elapsed(),
            _ => Duration::from_millis(0),
        }
    }
}
