//! The persistence seam.
//!
//! The engine does not know how records are stored. Callers implement
//! [`ScheduleSource`] over their store, or load a [`ScheduleSnapshot`] (e.g. from
//! JSON) and hand that in.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::{
    Absence, Booking, Break, OperationType, RecordId, RecurringRule, StaffHours, Subject,
};

/// Read-only access to the records one resolver run needs.
pub trait ScheduleSource {
    /// Practice-wide opening hours for a weekday.
    fn opening_hours(&self, weekday: Weekday) -> Vec<RecurringRule>;

    /// Working hours of a staff member for a weekday.
    fn staff_hours(&self, staff_id: RecordId, weekday: Weekday) -> Vec<RecurringRule>;

    /// Active absences of `subject` overlapping `[from, to]` (inclusive dates).
    fn absences(&self, subject: &Subject, from: NaiveDate, to: NaiveDate) -> Vec<Absence>;

    /// Active breaks on `date`: practice-wide ones for `None`, the subject's own
    /// otherwise.
    fn breaks(&self, subject: Option<&Subject>, date: NaiveDate) -> Vec<Break>;

    /// Occupying bookings holding `subject` that overlap `[from, to)`.
    fn occupying_bookings(
        &self,
        subject: &Subject,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Booking>;
}

/// An in-memory copy of the scheduling tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSnapshot {
    pub opening_hours: Vec<RecurringRule>,
    pub staff_hours: Vec<StaffHours>,
    pub absences: Vec<Absence>,
    pub breaks: Vec<Break>,
    pub bookings: Vec<Booking>,
    pub operation_types: Vec<OperationType>,
}

impl ScheduleSnapshot {
    /// Parse a snapshot from its JSON form (the shape `Serialize` produces).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Number of well-formed, occupying bookings (appointments and operations).
    pub fn plannings(&self) -> usize {
        self.bookings
            .iter()
            .filter(|b| b.is_occupying() && b.is_well_formed())
            .count()
    }
}

impl ScheduleSource for ScheduleSnapshot {
    fn opening_hours(&self, weekday: Weekday) -> Vec<RecurringRule> {
        self.opening_hours
            .iter()
            .filter(|r| r.weekday == weekday)
            .copied()
            .collect()
    }

    fn staff_hours(&self, staff_id: RecordId, weekday: Weekday) -> Vec<RecurringRule> {
        self.staff_hours
            .iter()
            .filter(|h| h.staff_id == staff_id && h.rule.weekday == weekday)
            .map(|h| h.rule)
            .collect()
    }

    fn absences(&self, subject: &Subject, from: NaiveDate, to: NaiveDate) -> Vec<Absence> {
        self.absences
            .iter()
            .filter(|a| a.active && a.subject == *subject && a.start_date <= to && from <= a.end_date)
            .cloned()
            .collect()
    }

    fn breaks(&self, subject: Option<&Subject>, date: NaiveDate) -> Vec<Break> {
        self.breaks
            .iter()
            .filter(|b| b.active && b.date == date && b.subject.as_ref() == subject)
            .cloned()
            .collect()
    }

    fn occupying_bookings(
        &self,
        subject: &Subject,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Booking> {
        self.bookings
            .iter()
            .filter(|b| b.is_occupying() && b.occupies(subject) && b.start < to && from < b.end)
            .cloned()
            .collect()
    }
}
