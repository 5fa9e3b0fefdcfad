//! Wall-clock timing for load and search phases.

use std::time::{Duration, Instant};

/// Collects phase durations for a single `knn` run.
#[derive(Debug, Default)]
pub struct SearchTimings {
    load: Duration,
    search: Duration,
    vectors_scanned: usize,
}

impl SearchTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time `f` and add its duration to the load phase.
    pub fn time_load<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.load += start.elapsed();
        out
    }

    /// Record a completed search over `scanned` vectors.
    pub fn record_search(&mut self, duration: Duration, scanned: usize) {
        self.search += duration;
        self.vectors_scanned += scanned;
    }

    pub fn load(&self) -> Duration {
        self.load
    }

    pub fn search(&self) -> Duration {
        self.search
    }

    /// Scan throughput in vectors per second.
    pub fn vectors_per_sec(&self) -> f64 {
        let secs = self.search.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.vectors_scanned as f64 / secs
    }
}
