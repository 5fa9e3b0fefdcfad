//! # Brute-force k-NN
//!
//! Exact k-nearest-neighbor search over an in-memory set of vectors, meant as
//! a reference baseline for vector similarity search.
//!
//! This library provides:
//! - Euclidean (L2) distance with a wide accumulator
//! - A bounded top-k selector with a stable tie policy
//! - Sequential and sharded brute-force scans
//! - An `.fvecs` loader
//!
//! ## Example
//!
//! ```rust
//! use bruteforce_knn::{BruteForceSearcher, Vector};
//!
//! let database = vec![
//!     Vector::new(vec![1.0, 0.0]),
//!     Vector::new(vec![0.0, 1.0]),
//!     Vector::new(vec![1.0, 1.0]),
//! ];
//! let query = Vector::new(vec![0.9, 0.1]);
//!
//! let outcome = BruteForceSearcher::euclidean()
//!     .search(&database, &query, 2)
//!     .unwrap();
//! assert_eq!(outcome.results.indices(), vec![0, 2]);
//! ```

pub mod config;
pub mod distance;
pub mod error;
pub mod fvecs;
pub mod metrics;
pub mod search;
pub mod top_k;
pub mod vector;

pub use config::SearchConfig;
pub use distance::{euclidean_distance, DistanceMetric, Euclidean};
pub use error::{KnnError, Result};
pub use search::{search, BruteForceSearcher, NoopObserver, ScanObserver, SearchOutcome};
pub use top_k::{RankedResultList, SearchResult, SelectorState, TopKSelector};
pub use vector::Vector;
