//! Half-open time intervals and the set algebra used to combine schedule layers.
//!
//! Every interval is `[start, end)`: touching intervals such as `[09:00, 10:00)` and
//! `[10:00, 11:00)` do NOT overlap. All operations are pure and total; degenerate
//! intervals (`start >= end`) are rejected by [`Interval::new`] and never produced
//! by the algebra.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Which schedule layer an interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    OpeningHours,
    StaffHours,
    Absence,
    Break,
    Booking,
    /// A computed free range (resolver output, suggestion candidates).
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: IntervalKind,
}

impl Interval {
    /// Build an interval, rejecting empty or reversed ranges.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidInterval` if `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, kind: IntervalKind) -> Result<Self> {
        if start >= end {
            return Err(EngineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end, kind })
    }

    /// Same as [`Interval::new`] but yields `None` for degenerate ranges.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>, kind: IntervalKind) -> Option<Self> {
        (start < end).then_some(Self { start, end, kind })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Relabel the interval, keeping its bounds.
    pub fn with_kind(self, kind: IntervalKind) -> Self {
        Self { kind, ..self }
    }

    /// `start <= t < end`.
    pub fn covers_point(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Two ranges overlap iff `a.start < b.end && b.start < a.end`.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.overlaps_range(other.start, other.end)
    }

    /// `other` lies entirely within `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Overlap of two intervals, or `None` when they are disjoint or merely touch.
///
/// The result keeps the kind of `a`.
pub fn intersect(a: &Interval, b: &Interval) -> Option<Interval> {
    Interval::try_new(a.start.max(b.start), a.end.min(b.end), a.kind)
}

/// Remove `cut` from `base`, leaving zero, one or two pieces.
pub fn subtract(base: &Interval, cut: &Interval) -> Vec<Interval> {
    if !base.overlaps(cut) {
        return vec![*base];
    }

    let left = Interval::try_new(base.start, cut.start, base.kind);
    let right = Interval::try_new(cut.end, base.end, base.kind);
    left.into_iter().chain(right).collect()
}

/// Remove every cut from every base interval.
///
/// The working list is re-normalized after each cut so it never grows beyond
/// one more piece per cut.
pub fn subtract_all(base: &[Interval], cuts: &[Interval]) -> Vec<Interval> {
    let mut remaining = merge_adjacent(base);

    for cut in cuts {
        if remaining.is_empty() {
            break;
        }
        let pieces: Vec<Interval> = remaining.iter().flat_map(|b| subtract(b, cut)).collect();
        remaining = merge_adjacent(&pieces);
    }

    remaining
}

/// Coalesce overlapping or touching intervals into maximal runs.
///
/// Returns a start-sorted, non-overlapping list with no zero-length entries. Each
/// run keeps the kind of its earliest member.
pub fn merge_adjacent(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(|i| i.start < i.end).collect();
    sorted.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }

    merged
}

/// Intersection of two interval sets (`a AND b`).
///
/// Both inputs are normalized first; the output is normalized and keeps the kinds
/// of `a`.
pub fn intersect_all(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let a = merge_adjacent(a);
    let b = merge_adjacent(b);

    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(overlap) = intersect(&a[i], &b[j]) {
            result.push(overlap);
        }
        // Advance whichever interval finishes first; the other may still overlap
        // the next one.
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

/// Sum of interval lengths in minutes. Callers pass normalized lists.
pub fn total_minutes(intervals: &[Interval]) -> i64 {
    intervals.iter().map(Interval::duration_minutes).sum()
}
