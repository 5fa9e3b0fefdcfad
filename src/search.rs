//! Brute-force k-NN search: an O(n * d) scan feeding a bounded top-k selector.

use rayon::prelude::*;
use tracing::debug;

use crate::config::SearchConfig;
use crate::distance::{DistanceMetric, Euclidean};
use crate::error::{KnnError, Result};
use crate::top_k::{self, RankedResultList, TopKSelector};
use crate::vector::Vector;

/// Receives scan progress from the searcher.
///
/// Called at 10% milestones of the database (only when it holds at least ten
/// vectors), between entries and never inside a distance computation.
pub trait ScanObserver {
    fn on_progress(&mut self, scanned: usize, total: usize);
}

impl<F: FnMut(usize, usize)> ScanObserver for F {
    fn on_progress(&mut self, scanned: usize, total: usize) {
        self(scanned, total)
    }
}

/// Observer that ignores progress. Used by [`BruteForceSearcher::search`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {
    fn on_progress(&mut self, _scanned: usize, _total: usize) {}
}

/// The result of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Up to `k` entries, closest first.
    pub results: RankedResultList,
    /// Database entries visited.
    pub scanned: usize,
    /// Entries excluded because their dimension did not match the query.
    pub skipped: usize,
}

impl SearchOutcome {
    /// True when every database entry was excluded for a dimension mismatch,
    /// as opposed to the database simply holding fewer than `k` vectors.
    pub fn all_mismatched(&self) -> bool {
        self.scanned > 0 && self.skipped == self.scanned
    }
}

/// Exact nearest-neighbor search by comparing the query with every vector.
#[derive(Debug, Clone, Default)]
pub struct BruteForceSearcher<M = Euclidean> {
    metric: M,
}

impl BruteForceSearcher<Euclidean> {
    /// Create a searcher using Euclidean distance.
    pub fn euclidean() -> Self {
        Self::new(Euclidean)
    }
}

impl<M: DistanceMetric> BruteForceSearcher<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Find the `k` vectors in `database` closest to `query`.
    ///
    /// Fails with [`KnnError::InvalidK`] or [`KnnError::EmptyDatabase`] before
    /// any distance is computed. Entries whose dimension differs from the
    /// query's are skipped and counted in [`SearchOutcome::skipped`].
    pub fn search(
        &self,
        database: &[Vector],
        query: &Vector,
        k: usize,
    ) -> Result<SearchOutcome> {
        self.search_with_observer(database, query, k, &mut NoopObserver)
    }

    /// Like [`search`](Self::search), reporting progress to `observer`.
    pub fn search_with_observer(
        &self,
        database: &[Vector],
        query: &Vector,
        k: usize,
        observer: &mut dyn ScanObserver,
    ) -> Result<SearchOutcome> {
        let mut selector = TopKSelector::new(k)?;
        if database.is_empty() {
            return Err(KnnError::EmptyDatabase);
        }

        let total = database.len();
        let milestone = if total >= 10 { total / 10 } else { 0 };

        let skipped = self.scan_into(&mut selector, database, 0, query, |scanned| {
            if milestone > 0 && scanned % milestone == 0 {
                observer.on_progress(scanned, total);
            }
        })?;

        debug!(scanned = total, skipped, k, "scan complete");
        Ok(SearchOutcome {
            results: selector.drain(),
            scanned: total,
            skipped,
        })
    }

    /// Scan `shard` (whose first entry has database index `base`) into
    /// `selector`, returning the number of skipped entries.
    fn scan_into(
        &self,
        selector: &mut TopKSelector,
        shard: &[Vector],
        base: usize,
        query: &Vector,
        mut after_entry: impl FnMut(usize),
    ) -> Result<usize> {
        let mut skipped = 0;
        for (offset, vector) in shard.iter().enumerate() {
            let index = base + offset;
            match self.metric.distance(query, vector) {
                Ok(distance) => {
                    selector.offer(index, distance)?;
                }
                Err(KnnError::DimensionMismatch { expected, actual }) => {
                    debug!(index, expected, actual, "skipping vector with mismatched dimension");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
            after_entry(offset + 1);
        }
        Ok(skipped)
    }
}

impl<M: DistanceMetric + Sync> BruteForceSearcher<M> {
    /// Search with the database split into `shards` contiguous pieces scanned
    /// concurrently, each into its own selector, then merged.
    ///
    /// Returns the same results as [`search`](Self::search), ties included.
    pub fn search_parallel(
        &self,
        database: &[Vector],
        query: &Vector,
        k: usize,
        shards: usize,
    ) -> Result<SearchOutcome> {
        if k == 0 {
            return Err(KnnError::InvalidK { k });
        }
        if database.is_empty() {
            return Err(KnnError::EmptyDatabase);
        }

        let shards = shards.clamp(1, database.len());
        let shard_len = database.len().div_ceil(shards);

        let partials = database
            .par_chunks(shard_len)
            .enumerate()
            .map(|(shard, vectors)| -> Result<(RankedResultList, usize)> {
                let mut selector = TopKSelector::new(k)?;
                let skipped =
                    self.scan_into(&mut selector, vectors, shard * shard_len, query, |_| {})?;
                Ok((selector.drain(), skipped))
            })
            .collect::<Result<Vec<_>>>()?;

        let skipped: usize = partials.iter().map(|(_, s)| s).sum();
        let results = top_k::merge(k, partials.into_iter().map(|(list, _)| list))?;

        debug!(scanned = database.len(), skipped, k, shards, "parallel scan complete");
        Ok(SearchOutcome {
            results,
            scanned: database.len(),
            skipped,
        })
    }

    /// Run a search as described by `config`, sequentially (with progress
    /// reporting) or sharded.
    pub fn run(
        &self,
        database: &[Vector],
        query: &Vector,
        config: &SearchConfig,
        observer: &mut dyn ScanObserver,
    ) -> Result<SearchOutcome> {
        match config.shards {
            Some(shards) if config.is_parallel() => {
                self.search_parallel(database, query, config.k, shards)
            }
            _ => self.search_with_observer(database, query, config.k, observer),
        }
    }
}

/// Euclidean k-NN search over `database`.
pub fn search(database: &[Vector], query: &Vector, k: usize) -> Result<SearchOutcome> {
    BruteForceSearcher::euclidean().search(database, query, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn db(rows: &[&[f32]]) -> Vec<Vector> {
        rows.iter().map(|r| Vector::new(r.to_vec())).collect()
    }

    #[test]
    fn test_search_basic() {
        let database = db(&[&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[1.0, 1.0, 0.0]]);
        let query = Vector::new(vec![1.0, 0.0, 0.0]);
        let outcome = search(&database, &query, 2).unwrap();

        assert_eq!(outcome.results.indices(), vec![0, 2]);
        assert_eq!(outcome.results.get(0).unwrap().distance, 0.0);
        assert_relative_eq!(outcome.results.get(1).unwrap().distance, 1.0, epsilon = 1e-6);
        assert_eq!(outcome.scanned, 3);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn test_identical_vectors_ordered_by_index() {
        let v = [0.5, 0.25];
        let database = db(&[&v, &v, &v]);
        let outcome = search(&database, &Vector::new(v.to_vec()), 2).unwrap();
        assert_eq!(outcome.results.indices(), vec![0, 1]);
        assert!(outcome.results.iter().all(|r| r.distance == 0.0));
    }

    #[test]
    fn test_mismatched_entries_are_skipped() {
        let database = db(&[&[1.0, 1.0], &[0.0, 0.0, 0.0], &[2.0, 2.0]]);
        let query = Vector::new(vec![0.0, 0.0]);
        let outcome = search(&database, &query, 5).unwrap();
        assert_eq!(outcome.results.indices(), vec![0, 2]);
        assert_eq!(outcome.skipped, 1);
        assert!(!outcome.all_mismatched());
    }

    #[test]
    fn test_all_mismatched_is_distinct_from_small_database() {
        let database = db(&[&[1.0], &[2.0]]);
        let outcome = search(&database, &Vector::new(vec![0.0, 0.0]), 3).unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.all_mismatched());
    }

    #[test]
    fn test_empty_database_rejected() {
        let query = Vector::new(vec![1.0]);
        assert!(matches!(search(&[], &query, 1), Err(KnnError::EmptyDatabase)));
        assert!(matches!(
            BruteForceSearcher::euclidean().search_parallel(&[], &query, 1, 4),
            Err(KnnError::EmptyDatabase)
        ));
    }

    #[test]
    fn test_progress_milestones() {
        let database: Vec<Vector> = (0..100).map(|i| Vector::new(vec![i as f32])).collect();
        let query = Vector::new(vec![0.0]);
        let mut seen = Vec::new();
        let mut record = |s: usize, t: usize| seen.push((s, t));
        BruteForceSearcher::euclidean()
            .search_with_observer(&database, &query, 3, &mut record)
            .unwrap();
        let expected: Vec<(usize, usize)> = (1..=10).map(|m| (m * 10, 100)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_no_progress_for_tiny_database() {
        let database = db(&[&[1.0], &[2.0]]);
        let query = Vector::new(vec![0.0]);
        let mut calls = 0;
        let mut count = |_: usize, _: usize| calls += 1;
        BruteForceSearcher::euclidean()
            .search_with_observer(&database, &query, 1, &mut count)
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_run_dispatches_on_shards() {
        let database: Vec<Vector> = (0..50).map(|i| Vector::new(vec![(i % 7) as f32])).collect();
        let query = Vector::new(vec![3.0]);
        let searcher = BruteForceSearcher::euclidean();

        let sequential = SearchConfig {
            k: 8,
            shards: None,
            report_progress: false,
        };
        let sharded = SearchConfig {
            k: 8,
            shards: Some(4),
            report_progress: false,
        };
        let a = searcher.run(&database, &query, &sequential, &mut NoopObserver).unwrap();
        let b = searcher.run(&database, &query, &sharded, &mut NoopObserver).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noop_observer_matches_plain_search() {
        let database: Vec<Vector> = (0..30).map(|i| Vector::new(vec![i as f32, 1.0])).collect();
        let query = Vector::new(vec![12.5, 1.0]);
        let searcher = BruteForceSearcher::euclidean();

        let observed = searcher
            .search_with_observer(&database, &query, 4, &mut NoopObserver)
            .unwrap();
        assert_eq!(observed, searcher.search(&database, &query, 4).unwrap());
        assert_eq!(observed.results.indices(), vec![12, 13, 11, 14]);
    }
}
