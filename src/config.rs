//! Search configuration

/// Parameters for one search invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Number of nearest neighbors to return.
    pub k: usize,
    /// Split the scan across this many shards. `None` or `Some(1)` scans
    /// sequentially.
    pub shards: Option<usize>,
    /// Report progress at 10% milestones (sequential scans only).
    pub report_progress: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            k: 10,
            shards: None,
            report_progress: true,
        }
    }
}

impl SearchConfig {
    pub fn with_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.shards, Some(s) if s > 1)
    }
}
