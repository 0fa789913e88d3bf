//! Cumulative magnitude threshold counters
//!
//! Each recorded magnitude bumps every bucket whose threshold it strictly
//! exceeds, so a 120M sighting counts toward the 100M, 50M and 30M buckets
//! alike. Counters only grow.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterBucket {
    pub threshold: u64,
    pub count: u64,
}

pub const DEFAULT_THRESHOLDS: [u64; 3] = [100_000_000, 50_000_000, 30_000_000];

pub struct CounterAggregator {
    buckets: Mutex<Vec<CounterBucket>>,
}

impl CounterAggregator {
    /// Build buckets from thresholds in any order; duplicates are dropped
    pub fn new(thresholds: &[u64]) -> Self {
        let mut sorted: Vec<u64> = thresholds.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        let buckets = sorted
            .into_iter()
            .map(|threshold| CounterBucket { threshold, count: 0 })
            .collect();

        Self {
            buckets: Mutex::new(buckets),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&DEFAULT_THRESHOLDS)
    }

    pub fn record(&self, magnitude: u64) {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        for bucket in buckets.iter_mut() {
            if magnitude > bucket.threshold {
                bucket.count += 1;
            }
        }
    }

    /// Copy of the buckets, highest threshold first
    pub fn snapshot(&self) -> Vec<CounterBucket> {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for CounterAggregator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(agg: &CounterAggregator) -> Vec<u64> {
        agg.snapshot().iter().map(|b| b.count).collect()
    }

    #[test]
    fn test_thresholds_sorted_descending_and_deduped() {
        let agg = CounterAggregator::new(&[30, 100, 50, 100]);
        let thresholds: Vec<u64> = agg.snapshot().iter().map(|b| b.threshold).collect();
        assert_eq!(thresholds, vec![100, 50, 30]);
    }

    #[test]
    fn test_above_highest_increments_every_bucket() {
        let agg = CounterAggregator::with_defaults();
        agg.record(150_000_000);
        assert_eq!(counts(&agg), vec![1, 1, 1]);
    }

    #[test]
    fn test_below_lowest_increments_nothing() {
        let agg = CounterAggregator::with_defaults();
        agg.record(29_999_999);
        agg.record(0);
        assert_eq!(counts(&agg), vec![0, 0, 0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let agg = CounterAggregator::with_defaults();
        agg.record(50_000_000);
        assert_eq!(counts(&agg), vec![0, 0, 1]);

        agg.record(50_000_001);
        assert_eq!(counts(&agg), vec![0, 1, 2]);
    }

    #[test]
    fn test_counters_are_monotonic() {
        let agg = CounterAggregator::with_defaults();
        let mut previous = counts(&agg);

        for m in [10, 200_000_000, 40_000_000, 0, 75_000_000, 30_000_001] {
            agg.record(m);
            let current = counts(&agg);
            assert!(current.iter().zip(&previous).all(|(c, p)| c >= p));
            previous = current;
        }

        assert_eq!(previous, vec![1, 2, 4]);
    }
}
