//! Half-open time intervals and the mutable free-time pool.
//!
//! Intervals are `[start, end)`: two intervals that merely touch do not
//! overlap, but they are coalesced when merged into a pool.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A concrete `[start, end)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The common part of two intervals, if they overlap.
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let clipped = Interval::new(self.start.max(other.start), self.end.min(other.end));
        (!clipped.is_empty()).then_some(clipped)
    }

    /// The part of this interval that ends no later than `limit`.
    pub fn truncate_at(&self, limit: Option<DateTime<Utc>>) -> Option<Interval> {
        let end = match limit {
            Some(limit) => self.end.min(limit),
            None => self.end,
        };
        let clipped = Interval::new(self.start, end);
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Convert fractional hours to a whole-second [`Duration`], saturating at
/// [`Duration::MAX`].
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::try_seconds((hours * 3600.0).round() as i64).unwrap_or(Duration::MAX)
}

/// Convert a [`Duration`] to fractional hours.
pub fn duration_to_hours(duration: Duration) -> f64 {
    duration.num_seconds() as f64 / 3600.0
}

/// Sum of interval lengths.
pub fn total_duration(intervals: &[Interval]) -> Duration {
    intervals
        .iter()
        .fold(Duration::zero(), |acc, iv| acc + iv.duration())
}

/// Sort intervals and coalesce any that overlap or touch. Empty intervals are
/// dropped.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|iv| !iv.is_empty());
    intervals.sort_by_key(|iv| (iv.start, iv.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        if let Some(last) = merged.last_mut() {
            if iv.start <= last.end {
                last.end = last.end.max(iv.end);
                continue;
            }
        }
        merged.push(iv);
    }
    merged
}

/// Sorted, non-overlapping free time that placement consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityPool {
    intervals: Vec<Interval>,
}

impl AvailabilityPool {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self {
            intervals: merge_intervals(intervals),
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn into_intervals(self) -> Vec<Interval> {
        self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn total(&self) -> Duration {
        total_duration(&self.intervals)
    }

    /// Total length of the intervals that are at least `min_len` long.
    pub fn usable_total(&self, min_len: Duration) -> Duration {
        self.intervals
            .iter()
            .filter(|iv| iv.duration() >= min_len)
            .fold(Duration::zero(), |acc, iv| acc + iv.duration())
    }

    /// Remove `busy` from the pool, splitting any interval it cuts through.
    pub fn subtract(&mut self, busy: &Interval) {
        if busy.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.intervals.len() + 1);
        for iv in self.intervals.drain(..) {
            if !iv.overlaps(busy) {
                remaining.push(iv);
                continue;
            }
            if iv.start < busy.start {
                remaining.push(Interval::new(iv.start, busy.start));
            }
            if busy.end < iv.end {
                remaining.push(Interval::new(busy.end, iv.end));
            }
        }
        self.intervals = remaining;
    }

    /// Return `freed` to the pool, restricted to the parts that lie inside
    /// `within` (the originally declared availability).
    pub fn restore(&mut self, freed: &Interval, within: &AvailabilityPool) {
        let mut intervals = std::mem::take(&mut self.intervals);
        intervals.extend(within.intervals.iter().filter_map(|iv| iv.intersect(freed)));
        self.intervals = merge_intervals(intervals);
    }
}
