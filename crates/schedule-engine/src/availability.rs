//! Per-subject, per-day availability.
//!
//! Hours layers are intersected (the practice AND the staff member must both be
//! open); every other layer is subtracted:
//!
//! ```text
//! free = (opening ∩ staff_hours) − practice breaks − own breaks − absence − bookings
//! ```
//!
//! Rooms and devices have no staff hours, so their base is the opening hours alone.
//! Subtraction order does not matter, so the layers are collected into one cut list.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::interval::{intersect_all, subtract_all, total_minutes, Interval, IntervalKind};
use crate::materialize::LocalCalendar;
use crate::model::Subject;
use crate::source::ScheduleSource;

/// Why a day has (or lacks) a base of working hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoursStatus {
    /// Hours exist; `free` may still be empty if the day is fully booked.
    Open,
    /// The practice is closed, or practice and staff hours do not intersect.
    Closed,
    /// A staff member has no working-hours rule for this weekday.
    NoDeclaredHours,
}

/// Free time of one subject on one local calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub subject: Subject,
    pub date: NaiveDate,
    pub status: HoursStatus,
    /// Start-sorted, non-overlapping free intervals.
    pub free: Vec<Interval>,
}

impl DayAvailability {
    pub fn total_free_minutes(&self) -> i64 {
        total_minutes(&self.free)
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

/// Outcome of asking whether one concrete interval can be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCheck {
    Bookable,
    /// Not inside the subject's working hours (or the practice is closed).
    OutsideHours,
    NoDeclaredHours,
    /// Inside working hours but blocked by a break, absence or booking.
    Occupied,
}

/// The hours base and the resulting free list, before they are split apart.
struct Layers {
    status: HoursStatus,
    base: Vec<Interval>,
    free: Vec<Interval>,
}

/// Resolves availability against a [`ScheduleSource`] snapshot.
pub struct Resolver<'a, S: ScheduleSource + ?Sized> {
    source: &'a S,
    calendar: LocalCalendar,
}

impl<'a, S: ScheduleSource + ?Sized> Resolver<'a, S> {
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if the configured timezone is unknown.
    pub fn new(source: &'a S, config: &EngineConfig) -> Result<Self> {
        Ok(Self::with_calendar(source, LocalCalendar::from_config(config)?))
    }

    pub fn with_calendar(source: &'a S, calendar: LocalCalendar) -> Self {
        Self { source, calendar }
    }

    pub fn calendar(&self) -> &LocalCalendar {
        &self.calendar
    }

    /// Free intervals of `subject` on the local date `date`.
    ///
    /// Unknown subjects and closed days yield an empty list rather than an error;
    /// `status` tells "closed" apart from "no schedule declared".
    pub fn resolve(&self, subject: &Subject, date: NaiveDate) -> DayAvailability {
        let layers = self.layers(subject, date);
        tracing::debug!(
            %subject,
            %date,
            status = ?layers.status,
            free = layers.free.len(),
            "resolved availability"
        );
        DayAvailability {
            subject: *subject,
            date,
            status: layers.status,
            free: layers.free,
        }
    }

    /// Like [`resolve`](Self::resolve), keeping only free intervals that can hold
    /// at least `min_duration`.
    pub fn resolve_fitting(
        &self,
        subject: &Subject,
        date: NaiveDate,
        min_duration: Duration,
    ) -> DayAvailability {
        let mut day = self.resolve(subject, date);
        day.free.retain(|f| f.duration() >= min_duration);
        day
    }

    /// Whether `slot` lies wholly inside one free interval of its start date.
    pub fn check_slot(&self, subject: &Subject, slot: &Interval) -> SlotCheck {
        let date = self.calendar.local_date(slot.start);
        let layers = self.layers(subject, date);

        match layers.status {
            HoursStatus::NoDeclaredHours => SlotCheck::NoDeclaredHours,
            HoursStatus::Closed => SlotCheck::OutsideHours,
            HoursStatus::Open => {
                if layers.free.iter().any(|f| f.contains(slot)) {
                    SlotCheck::Bookable
                } else if layers.base.iter().any(|b| b.contains(slot)) {
                    SlotCheck::Occupied
                } else {
                    SlotCheck::OutsideHours
                }
            }
        }
    }

    fn layers(&self, subject: &Subject, date: NaiveDate) -> Layers {
        let closed = |status: HoursStatus| Layers {
            status,
            base: Vec::new(),
            free: Vec::new(),
        };

        let Some(day) = self.calendar.full_day(date, IntervalKind::Booking) else {
            return closed(HoursStatus::Closed);
        };
        let weekday = date.weekday();

        let opening = self.calendar.materialize_all(
            &self.source.opening_hours(weekday),
            date,
            IntervalKind::OpeningHours,
        );
        if opening.is_empty() {
            return closed(HoursStatus::Closed);
        }

        let base = match subject {
            Subject::Staff(staff_id) => {
                let rules = self.source.staff_hours(*staff_id, weekday);
                if rules.is_empty() {
                    return closed(HoursStatus::NoDeclaredHours);
                }
                let staff = self
                    .calendar
                    .materialize_all(&rules, date, IntervalKind::StaffHours);
                intersect_all(&opening, &staff)
            }
            Subject::Resource(_) => opening,
        };
        if base.is_empty() {
            return closed(HoursStatus::Closed);
        }

        let cuts = self.cuts(subject, date, &day);
        tracing::trace!(%subject, %date, base = base.len(), cuts = cuts.len(), "availability layers");

        let free = subtract_all(&base, &cuts)
            .into_iter()
            .map(|i| i.with_kind(IntervalKind::Free))
            .collect();

        Layers {
            status: HoursStatus::Open,
            base,
            free,
        }
    }

    /// Every subtractive interval for `subject` on `date`.
    fn cuts(&self, subject: &Subject, date: NaiveDate, day: &Interval) -> Vec<Interval> {
        let mut cuts = Vec::new();

        let practice_breaks = self.source.breaks(None, date);
        let own_breaks = self.source.breaks(Some(subject), date);
        cuts.extend(
            practice_breaks
                .iter()
                .chain(own_breaks.iter())
                .filter(|b| b.applies_to(subject))
                .filter_map(|b| self.calendar.break_interval(b)),
        );

        cuts.extend(
            self.source
                .absences(subject, date, date)
                .iter()
                .filter_map(|a| self.calendar.absence_interval(a, date)),
        );

        for booking in self.source.occupying_bookings(subject, day.start, day.end) {
            match booking.interval() {
                Some(interval) => cuts.push(interval),
                None => tracing::debug!(booking = booking.id, "skipping malformed booking"),
            }
        }

        cuts
    }
}
