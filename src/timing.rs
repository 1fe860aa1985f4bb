//! Phase timing for the packager pipeline.

use std::time::{Duration, Instant};

/// Measures one pipeline phase and reports it when finished.
pub struct Timer {
    phase: &'static str,
    start: Instant,
}

impl Timer {
    /// Start timing the named phase.
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            start: Instant::now(),
        }
    }

    /// Stop the timer, print the elapsed time and return it.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        let secs = elapsed.as_secs_f64();
        if secs >= 60.0 {
            println!("  [{:.1}m] {}", secs / 60.0, self.phase);
        } else {
            println!("  [{:.1}s] {}", secs, self.phase);
        }
        tracing::debug!(phase = self.phase, elapsed_ms = elapsed.as_millis() as u64, "phase finished");
        elapsed
    }
}
