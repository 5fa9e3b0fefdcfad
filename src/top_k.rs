//! Bounded top-k selection over a stream of `(index, distance)` observations.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::error::{KnnError, Result};

/// A database entry paired with its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    pub index: usize,
    pub distance: f32,
}

impl SearchResult {
    pub fn new(index: usize, distance: f32) -> Self {
        Self { index, distance }
    }
}

/// Total order on distances with NaN above every number.
fn cmp_distance(a: f32, b: f32) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Ranking order: distance ascending, then index ascending.
fn cmp_rank(a: &SearchResult, b: &SearchResult) -> Ordering {
    cmp_distance(a.distance, b.distance).then_with(|| a.index.cmp(&b.index))
}

/// Heap entry tagged with its arrival order. `BinaryHeap` keeps the worst
/// candidate on top: largest distance, and among equal distances the one
/// offered last.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    result: SearchResult,
    seq: u64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_distance(self.result.distance, other.result.distance)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Search results ordered closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RankedResultList {
    entries: Vec<SearchResult>,
}

impl RankedResultList {
    /// Build a ranked list from arbitrary results, sorting them into rank order.
    pub fn from_unsorted(mut entries: Vec<SearchResult>) -> Self {
        entries.sort_by(cmp_rank);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, rank: usize) -> Option<&SearchResult> {
        self.entries.get(rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[SearchResult] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<SearchResult> {
        self.entries
    }

    /// Database indices in rank order.
    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|r| r.index).collect()
    }
}

impl IntoIterator for RankedResultList {
    type Item = SearchResult;
    type IntoIter = std::vec::IntoIter<SearchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Lifecycle of a [`TopKSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Empty,
    Filling,
    Full,
    Drained,
}

/// Keeps the `k` smallest-distance observations seen so far.
///
/// Once `k` entries are held, an incoming observation replaces the current
/// worst only if its distance is strictly smaller. An observation tied with
/// the worst is discarded, so among equidistant entries the one offered first
/// is kept. Memory never exceeds `k` entries.
#[derive(Debug)]
pub struct TopKSelector {
    heap: BinaryHeap<Candidate>,
    k: usize,
    offered: u64,
    drained: Option<RankedResultList>,
}

impl TopKSelector {
    /// Create a selector for the `k` nearest entries. `k` must be at least 1.
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(KnnError::InvalidK { k });
        }
        Ok(Self {
            heap: BinaryHeap::with_capacity(k),
            k,
            offered: 0,
            drained: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn state(&self) -> SelectorState {
        if self.drained.is_some() {
            SelectorState::Drained
        } else if self.heap.is_empty() {
            SelectorState::Empty
        } else if self.heap.len() < self.k {
            SelectorState::Filling
        } else {
            SelectorState::Full
        }
    }

    /// Distance an observation must beat to be retained: the current worst
    /// when full, infinity otherwise.
    pub fn threshold(&self) -> f32 {
        if self.heap.len() < self.k {
            return f32::INFINITY;
        }
        self.heap.peek().map(|c| c.result.distance).unwrap_or(f32::INFINITY)
    }

    /// Offer an observation. Returns whether it is now retained.
    ///
    /// O(log k): the worst entry is read from the top of the heap and, when
    /// displaced, replaced in place and sifted down.
    pub fn offer(&mut self, index: usize, distance: f32) -> Result<bool> {
        if self.drained.is_some() {
            return Err(KnnError::SelectorDrained);
        }

        let candidate = Candidate {
            result: SearchResult::new(index, distance),
            seq: self.offered,
        };
        self.offered += 1;
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            return Ok(true);
        }

        if let Some(mut worst) = self.heap.peek_mut() {
            if cmp_distance(distance, worst.result.distance) == Ordering::Less {
                *worst = candidate;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drain the retained entries, closest first.
    ///
    /// The selector is frozen afterwards: further offers fail, and further
    /// drains return the same snapshot.
    pub fn drain(&mut self) -> RankedResultList {
        if let Some(snapshot) = &self.drained {
            return snapshot.clone();
        }
        let heap = std::mem::take(&mut self.heap);
        let entries = heap.into_vec().into_iter().map(|c| c.result).collect();
        let snapshot = RankedResultList::from_unsorted(entries);
        self.drained = Some(snapshot.clone());
        snapshot
    }
}

/// Final selection over per-shard ranked lists.
///
/// Each input must be the top-k of a disjoint shard. The merged list holds the
/// overall `k` closest entries, ties broken by index ascending, which matches
/// a single sequential scan when shards cover contiguous index ranges.
pub fn merge<I>(k: usize, lists: I) -> Result<RankedResultList>
where
    I: IntoIterator<Item = RankedResultList>,
{
    if k == 0 {
        return Err(KnnError::InvalidK { k });
    }
    let mut merged: Vec<SearchResult> = lists.into_iter().flatten().collect();
    merged.sort_by(cmp_rank);
    merged.truncate(k);
    Ok(RankedResultList { entries: merged })
}
