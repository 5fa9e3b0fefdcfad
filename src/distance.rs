//! L2 distance between vectors

use crate::error::{KnnError, Result};
use crate::vector::Vector;

/// A distance function the searcher can scan with.
///
/// Only Euclidean distance ships with the crate; the trait exists so the scan
/// can be driven by any metric with the same failure contract.
pub trait DistanceMetric {
    /// Compute the distance between `a` and `b`.
    ///
    /// Returns [`KnnError::DimensionMismatch`] when the operands differ in length.
    fn distance(&self, a: &Vector, b: &Vector) -> Result<f32>;
}

/// Euclidean (L2) distance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn distance(&self, a: &Vector, b: &Vector) -> Result<f32> {
        euclidean_distance(a.as_slice(), b.as_slice())
    }
}

/// Compute Euclidean (L2) distance between two slices.
///
/// Squared differences are accumulated in `f64` so that high-dimensional
/// inputs do not lose low-order bits before the square root.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(KnnError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = f64::from(x) - f64::from(y);
            diff * diff
        })
        .sum();

    Ok(sum.sqrt() as f32)
}
