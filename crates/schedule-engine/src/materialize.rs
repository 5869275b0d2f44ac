//! Turning wall-clock records into concrete UTC intervals.
//!
//! Opening hours, staff hours and breaks are stored as local times of day; the
//! resolver and detector work on absolute instants. [`LocalCalendar`] is the only
//! place where that conversion happens, so DST behaviour lives in one spot.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::config::EngineConfig;
use crate::dst::{resolve_local, DstPolicy};
use crate::error::Result;
use crate::interval::{merge_adjacent, Interval, IntervalKind};
use crate::model::{Absence, Break, RecurringRule};

/// The practice's timezone together with its DST policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCalendar {
    pub tz: Tz,
    pub dst_policy: DstPolicy,
}

impl LocalCalendar {
    pub fn new(tz: Tz, dst_policy: DstPolicy) -> Self {
        Self { tz, dst_policy }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.tz()?, config.dst_policy))
    }

    /// Concrete interval for `rule` on `date`, tagged with `kind`.
    ///
    /// Returns `None` when the rule is for another weekday, is malformed
    /// (`start_time >= end_time`), or a boundary is dropped by [`DstPolicy::Skip`].
    pub fn materialize(
        &self,
        rule: &RecurringRule,
        date: NaiveDate,
        kind: IntervalKind,
    ) -> Option<Interval> {
        if rule.weekday != date.weekday() || !rule.is_well_formed() {
            return None;
        }
        self.time_range(date, rule.start_time, rule.end_time, kind)
    }

    /// Union of every rule that applies on `date`, normalized.
    pub fn materialize_all(
        &self,
        rules: &[RecurringRule],
        date: NaiveDate,
        kind: IntervalKind,
    ) -> Vec<Interval> {
        let intervals: Vec<Interval> = rules
            .iter()
            .filter_map(|rule| self.materialize(rule, date, kind))
            .collect();
        merge_adjacent(&intervals)
    }

    /// `[local midnight, next local midnight)` for `date`.
    pub fn full_day(&self, date: NaiveDate, kind: IntervalKind) -> Option<Interval> {
        let next = date.succ_opt()?;
        // Day bounds always exist, even where midnight itself falls in a DST gap.
        let start = resolve_local(&self.tz, date.and_time(NaiveTime::MIN), DstPolicy::ShiftForward)?;
        let end = resolve_local(&self.tz, next.and_time(NaiveTime::MIN), DstPolicy::ShiftForward)?;
        Interval::try_new(start, end, kind)
    }

    /// Full-day interval if `absence` covers `date`.
    pub fn absence_interval(&self, absence: &Absence, date: NaiveDate) -> Option<Interval> {
        if !absence.covers(date) {
            return None;
        }
        self.full_day(date, IntervalKind::Absence)
    }

    pub fn break_interval(&self, brk: &Break) -> Option<Interval> {
        if !brk.active {
            return None;
        }
        self.time_range(brk.date, brk.start_time, brk.end_time, IntervalKind::Break)
    }

    pub fn local_date(&self, t: DateTime<Utc>) -> NaiveDate {
        t.with_timezone(&self.tz).date_naive()
    }

    pub fn local_hour(&self, t: DateTime<Utc>) -> u32 {
        t.with_timezone(&self.tz).hour()
    }

    pub fn local_weekday(&self, t: DateTime<Utc>) -> Weekday {
        t.with_timezone(&self.tz).weekday()
    }

    /// Every local calendar date touched by `[start, end)`.
    pub fn dates_touched(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
        let first = self.local_date(start);
        // `end` is exclusive; a booking ending exactly at midnight does not touch the next day.
        let last = self.local_date(end - chrono::Duration::nanoseconds(1)).max(first);
        first.iter_days().take_while(|d| *d <= last).collect()
    }

    fn time_range(
        &self,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        kind: IntervalKind,
    ) -> Option<Interval> {
        let start = resolve_local(&self.tz, date.and_time(start_time), self.dst_policy)?;
        let end = resolve_local(&self.tz, date.and_time(end_time), self.dst_policy)?;
        Interval::try_new(start, end, kind)
    }
}
