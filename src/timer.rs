use std::time::{Duration, Instant};

use tracing::warn;

/// Accumulating monotonic stopwatch bracketing a kernel's repetition loop.
#[derive(Debug, Default, Clone)]
pub struct Timer {
    started: Option<Instant>,
    elapsed: Duration,
    intervals: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting an already running timer keeps the original start point.
    pub fn start(&mut self) {
        if self.started.is_some() {
            warn!(target: "kernelperf::timer", "start called on a running timer");
            return;
        }
        self.started = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        match self.started.take() {
            Some(start) => {
                self.elapsed += start.elapsed();
                self.intervals += 1;
            }
            None => warn!(target: "kernelperf::timer", "stop called on a stopped timer"),
        }
    }

    /// Total of all completed intervals
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
