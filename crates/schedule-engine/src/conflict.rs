//! Batch audit of stored bookings.
//!
//! Unlike the resolver, which answers "is this subject free now?", the detector
//! looks at the whole dataset and classifies every rule violation it finds. Each
//! rule is independent, so one pair of bookings can show up under more than one
//! [`ConflictKind`].
//!
//! Two bookings overlap when `a.start < b.end && b.start < a.end`; bookings that
//! merely touch are fine.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{EdgeHours, EngineConfig};
use crate::error::Result;
use crate::interval::{merge_adjacent, IntervalKind};
use crate::materialize::LocalCalendar;
use crate::model::{Absence, Booking, BookingKind, EntityRef, RecordId, RecurringRule, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two appointments of the same doctor overlap.
    DoctorConflict,
    /// Two operations of the same primary surgeon overlap.
    OperationOverlap,
    /// Two operations in the same room overlap.
    RoomConflict,
    /// Bookings of different doctors overlap in the same room. Two operations in one
    /// room are a [`ConflictKind::RoomConflict`] instead.
    AppointmentOverlap,
    /// A booking reaches outside the practice's opening hours.
    WorkingHoursViolation,
    /// A booking falls on a day its doctor is absent.
    DoctorAbsent,
    /// A booking starts unusually early or late. A flag, not a hard violation.
    EdgeCases,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 7] = [
        ConflictKind::DoctorConflict,
        ConflictKind::OperationOverlap,
        ConflictKind::RoomConflict,
        ConflictKind::AppointmentOverlap,
        ConflictKind::WorkingHoursViolation,
        ConflictKind::DoctorAbsent,
        ConflictKind::EdgeCases,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::DoctorConflict => "doctor_conflict",
            ConflictKind::OperationOverlap => "operation_overlap",
            ConflictKind::RoomConflict => "room_conflict",
            ConflictKind::AppointmentOverlap => "appointment_overlap",
            ConflictKind::WorkingHoursViolation => "working_hours_violation",
            ConflictKind::DoctorAbsent => "doctor_absent",
            ConflictKind::EdgeCases => "edge_cases",
        }
    }
}

/// The doctor or room a conflict is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ConflictOwner {
    Doctor(RecordId),
    Room(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub owner: Option<ConflictOwner>,
    /// Local date on which the violation starts.
    pub date: NaiveDate,
    /// Local hour (0-23) on which the violation starts.
    pub hour_of_day: u32,
    pub involved: Vec<EntityRef>,
}

pub struct ConflictDetector {
    calendar: LocalCalendar,
    edge_hours: EdgeHours,
}

impl ConflictDetector {
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if the configured timezone is unknown.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            calendar: LocalCalendar::from_config(config)?,
            edge_hours: config.edge_hours,
        })
    }

    /// Run every rule over the dataset.
    ///
    /// Cancelled and malformed bookings are skipped, never reported. The result is
    /// sorted (kind, date, hour, involved) so repeated runs compare equal.
    pub fn detect(
        &self,
        bookings: &[Booking],
        absences: &[Absence],
        opening_hours: &[RecurringRule],
    ) -> Vec<Conflict> {
        let mut valid: Vec<&Booking> = Vec::with_capacity(bookings.len());
        for booking in bookings.iter().filter(|b| b.is_occupying()) {
            if booking.is_well_formed() {
                valid.push(booking);
            } else {
                tracing::debug!(booking = booking.id, "skipping malformed booking in audit");
            }
        }

        let appointments: Vec<&Booking> = valid
            .iter()
            .copied()
            .filter(|b| b.kind == BookingKind::Appointment)
            .collect();
        let operations: Vec<&Booking> = valid
            .iter()
            .copied()
            .filter(|b| b.kind == BookingKind::Operation)
            .collect();

        let mut conflicts = Vec::new();

        for (doctor, group) in group_by(&appointments, |b| b.doctor_id) {
            let owner = ConflictOwner::Doctor(doctor);
            for (a, b) in overlapping_pairs(group) {
                conflicts.push(self.pair_conflict(ConflictKind::DoctorConflict, owner, a, b));
            }
        }
        for (surgeon, group) in group_by(&operations, |b| b.doctor_id) {
            let owner = ConflictOwner::Doctor(surgeon);
            for (a, b) in overlapping_pairs(group) {
                conflicts.push(self.pair_conflict(ConflictKind::OperationOverlap, owner, a, b));
            }
        }
        for (room, group) in group_by(&operations, |b| b.room_id) {
            let owner = ConflictOwner::Room(room);
            for (a, b) in overlapping_pairs(group) {
                conflicts.push(self.pair_conflict(ConflictKind::RoomConflict, owner, a, b));
            }
        }
        for (room, group) in group_by(&valid, |b| b.room_id) {
            let owner = ConflictOwner::Room(room);
            for (a, b) in cross_doctor_pairs(&group) {
                conflicts.push(self.pair_conflict(ConflictKind::AppointmentOverlap, owner, a, b));
            }
        }

        for booking in &valid {
            self.check_single(booking, absences, opening_hours, &mut conflicts);
        }

        conflicts.sort();
        tracing::debug!(
            bookings = bookings.len(),
            audited = valid.len(),
            conflicts = conflicts.len(),
            "conflict audit finished"
        );
        conflicts
    }

    /// Rules that look at one booking at a time.
    fn check_single(
        &self,
        booking: &Booking,
        absences: &[Absence],
        opening_hours: &[RecurringRule],
        out: &mut Vec<Conflict>,
    ) {
        let owner = booking.doctor_id.map(ConflictOwner::Doctor);
        let date = self.calendar.local_date(booking.start);
        let hour = self.calendar.local_hour(booking.start);
        let dates = self.calendar.dates_touched(booking.start, booking.end);

        let single = |kind: ConflictKind, date: NaiveDate, involved: Vec<EntityRef>| Conflict {
            kind,
            owner,
            date,
            hour_of_day: hour,
            involved,
        };

        if !self.within_opening_hours(booking, &dates, opening_hours) {
            out.push(single(ConflictKind::WorkingHoursViolation, date, vec![booking.entity_ref()]));
        }

        if let Some(doctor) = booking.doctor_id {
            let subject = Subject::Staff(doctor);
            for absence in absences.iter().filter(|a| a.subject == subject) {
                if let Some(day) = dates.iter().copied().find(|d| absence.covers(*d)) {
                    out.push(single(
                        ConflictKind::DoctorAbsent,
                        day,
                        vec![booking.entity_ref(), EntityRef::Absence(absence.id)],
                    ));
                }
            }
        }

        if hour < self.edge_hours.early || hour >= self.edge_hours.late {
            out.push(single(ConflictKind::EdgeCases, date, vec![booking.entity_ref()]));
        }
    }

    fn within_opening_hours(
        &self,
        booking: &Booking,
        dates: &[NaiveDate],
        opening_hours: &[RecurringRule],
    ) -> bool {
        let Some(interval) = booking.interval() else {
            return false;
        };
        let open: Vec<_> = dates
            .iter()
            .flat_map(|d| self.calendar.materialize_all(opening_hours, *d, IntervalKind::OpeningHours))
            .collect();
        merge_adjacent(&open).iter().any(|o| o.contains(&interval))
    }

    fn pair_conflict(
        &self,
        kind: ConflictKind,
        owner: ConflictOwner,
        earlier: &Booking,
        later: &Booking,
    ) -> Conflict {
        // The overlap begins where the later booking starts.
        Conflict {
            kind,
            owner: Some(owner),
            date: self.calendar.local_date(later.start),
            hour_of_day: self.calendar.local_hour(later.start),
            involved: vec![earlier.entity_ref(), later.entity_ref()],
        }
    }
}

/// Convenience wrapper: build a detector from `config` and run it once.
pub fn detect_conflicts(
    bookings: &[Booking],
    absences: &[Absence],
    opening_hours: &[RecurringRule],
    config: &EngineConfig,
) -> Result<Vec<Conflict>> {
    Ok(ConflictDetector::new(config)?.detect(bookings, absences, opening_hours))
}

fn group_by<'b>(
    bookings: &[&'b Booking],
    key: impl Fn(&Booking) -> Option<RecordId>,
) -> BTreeMap<RecordId, Vec<&'b Booking>> {
    let mut groups: BTreeMap<RecordId, Vec<&'b Booking>> = BTreeMap::new();
    for &booking in bookings {
        if let Some(id) = key(booking) {
            groups.entry(id).or_default().push(booking);
        }
    }
    groups
}

/// Overlapping pairs within one owner's bookings.
///
/// Sorts by `(start, id)` and sweeps: each booking is compared only with the
/// earlier bookings still running at its start. Without nesting that is exactly
/// the neighbouring booking; a long booking that swallows several short ones is
/// paired with each of them.
fn overlapping_pairs(mut group: Vec<&Booking>) -> Vec<(&Booking, &Booking)> {
    group.sort_by_key(|b| (b.start, b.id));

    let mut pairs = Vec::new();
    let mut running: Vec<&Booking> = Vec::new();
    for booking in group {
        running.retain(|r| r.end > booking.start);
        pairs.extend(running.iter().map(|r| (*r, booking)));
        running.push(booking);
    }
    pairs
}

/// Overlapping pairs in one room whose doctors differ, skipping operation pairs.
///
/// Full pairwise comparison: the doctor filter breaks the neighbour argument used
/// by [`overlapping_pairs`].
fn cross_doctor_pairs<'b>(group: &[&'b Booking]) -> Vec<(&'b Booking, &'b Booking)> {
    let mut sorted = group.to_vec();
    sorted.sort_by_key(|b| (b.start, b.id));

    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            let same_doctor = a.doctor_id.is_some() && a.doctor_id == b.doctor_id;
            let both_operations =
                a.kind == BookingKind::Operation && b.kind == BookingKind::Operation;
            if !same_doctor && !both_operations && a.start < b.end && b.start < a.end {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}
