//! Tests for the interval set algebra.

use chrono::{DateTime, TimeZone, Utc};
use schedule_engine::interval::total_minutes;
use schedule_engine::{
    intersect, intersect_all, merge_adjacent, subtract, subtract_all, EngineError, Interval,
    IntervalKind,
};

/// Helper: 2026-03-16 at the given hour/minute, UTC.
fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, min, 0).unwrap()
}

fn iv(start: (u32, u32), end: (u32, u32)) -> Interval {
    Interval::new(at(start.0, start.1), at(end.0, end.1), IntervalKind::OpeningHours).unwrap()
}

fn bounds(intervals: &[Interval]) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    intervals.iter().map(|i| (i.start, i.end)).collect()
}

// ── Construction ────────────────────────────────────────────────────────────

#[test]
fn reversed_interval_rejected() {
    let err = Interval::new(at(10, 0), at(9, 0), IntervalKind::Booking).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInterval { .. }));
}

#[test]
fn empty_interval_rejected() {
    assert!(Interval::new(at(9, 0), at(9, 0), IntervalKind::Booking).is_err());
    assert!(Interval::try_new(at(9, 0), at(9, 0), IntervalKind::Booking).is_none());
}

#[test]
fn covers_point_is_half_open() {
    let a = iv((9, 0), (10, 0));
    assert!(a.covers_point(at(9, 0)));
    assert!(a.covers_point(at(9, 59)));
    assert!(!a.covers_point(at(10, 0)));
}

// ── intersect ───────────────────────────────────────────────────────────────

#[test]
fn touching_intervals_do_not_intersect() {
    let a = iv((9, 0), (10, 0));
    let b = iv((10, 0), (11, 0));
    assert!(intersect(&a, &b).is_none());
    assert!(!a.overlaps(&b));
}

#[test]
fn partial_overlap_intersection() {
    let a = iv((9, 0), (11, 0));
    let b = iv((10, 0), (12, 0));
    let overlap = intersect(&a, &b).unwrap();
    assert_eq!((overlap.start, overlap.end), (at(10, 0), at(11, 0)));
}

// ── subtract ────────────────────────────────────────────────────────────────

#[test]
fn subtract_middle_splits_in_two() {
    let pieces = subtract(&iv((9, 0), (17, 0)), &iv((12, 0), (13, 0)));
    assert_eq!(
        bounds(&pieces),
        vec![(at(9, 0), at(12, 0)), (at(13, 0), at(17, 0))]
    );
}

#[test]
fn subtract_left_edge_leaves_right_remainder() {
    let pieces = subtract(&iv((9, 0), (12, 0)), &iv((8, 0), (9, 30)));
    assert_eq!(bounds(&pieces), vec![(at(9, 30), at(12, 0))]);
}

#[test]
fn subtract_covering_cut_removes_everything() {
    let pieces = subtract(&iv((9, 0), (12, 0)), &iv((8, 0), (13, 0)));
    assert!(pieces.is_empty());
}

#[test]
fn subtract_disjoint_cut_is_identity() {
    let base = iv((9, 0), (12, 0));
    assert_eq!(subtract(&base, &iv((12, 0), (13, 0))), vec![base]);
}

#[test]
fn subtract_all_applies_every_cut() {
    let base = vec![iv((9, 0), (17, 0))];
    let cuts = vec![
        iv((9, 0), (9, 30)),
        iv((12, 0), (13, 0)),
        iv((12, 30), (14, 0)),
        iv((16, 0), (18, 0)),
    ];
    let free = subtract_all(&base, &cuts);
    assert_eq!(
        bounds(&free),
        vec![(at(9, 30), at(12, 0)), (at(14, 0), at(16, 0))]
    );
}

#[test]
fn subtract_all_is_order_independent() {
    let base = vec![iv((8, 0), (18, 0))];
    let cuts = vec![iv((9, 0), (10, 0)), iv((15, 0), (16, 0)), iv((11, 0), (12, 30))];
    let mut reversed = cuts.clone();
    reversed.reverse();
    assert_eq!(subtract_all(&base, &cuts), subtract_all(&base, &reversed));
}

// ── merge / intersect_all ───────────────────────────────────────────────────

#[test]
fn merge_coalesces_overlapping_and_touching() {
    let merged = merge_adjacent(&[iv((13, 0), (14, 0)), iv((9, 0), (10, 0)), iv((10, 0), (11, 0)), iv((10, 30), (12, 0))]);
    assert_eq!(
        bounds(&merged),
        vec![(at(9, 0), at(12, 0)), (at(13, 0), at(14, 0))]
    );
}

#[test]
fn intersect_all_of_split_sets() {
    // Practice: 08-12, 13-18. Staff: 09-14.
    let practice = vec![iv((8, 0), (12, 0)), iv((13, 0), (18, 0))];
    let staff = vec![iv((9, 0), (14, 0))];
    let both = intersect_all(&practice, &staff);
    assert_eq!(
        bounds(&both),
        vec![(at(9, 0), at(12, 0)), (at(13, 0), at(14, 0))]
    );
    assert_eq!(total_minutes(&both), 240);
}

#[test]
fn intersect_all_with_empty_side_is_empty() {
    assert!(intersect_all(&[iv((9, 0), (10, 0))], &[]).is_empty());
}
