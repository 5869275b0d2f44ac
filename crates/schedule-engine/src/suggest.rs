//! Forward-scanning slot suggestions.
//!
//! Walks the dates `[start_date, start_date + horizon_days)`, resolves each one,
//! and emits candidate slots of exactly the requested duration on a fixed step
//! grid anchored at each free interval's start. Ascending scan order is the
//! ranking: the earliest slots come first.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::Resolver;
use crate::error::{EngineError, Result};
use crate::interval::{intersect_all, Interval, IntervalKind};
use crate::model::Subject;
use crate::source::ScheduleSource;

/// What to look for and how far ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// First local date to scan.
    pub start_date: NaiveDate,
    pub duration_minutes: i64,
    /// Maximum number of slots to return.
    pub limit: usize,
    /// Number of days to scan, `start_date` included.
    pub horizon_days: u32,
}

impl SuggestRequest {
    pub fn new(start_date: NaiveDate, duration_minutes: i64, limit: usize, horizon_days: u32) -> Self {
        Self {
            start_date,
            duration_minutes,
            limit,
            horizon_days,
        }
    }

    /// Reject requests that can never be satisfied.
    pub fn validate(&self) -> Result<()> {
        let in_range = Duration::try_minutes(self.duration_minutes).is_some();
        if self.duration_minutes <= 0 || !in_range {
            return Err(EngineError::InvalidDuration(self.duration_minutes));
        }
        if self.limit == 0 {
            return Err(EngineError::InvalidLimit);
        }
        if self.horizon_days == 0 {
            return Err(EngineError::InvalidHorizon);
        }
        Ok(())
    }

    /// The slot length. Out-of-range values saturate to zero; [`Self::validate`]
    /// rejects them before any scan.
    pub fn duration(&self) -> Duration {
        Duration::try_minutes(self.duration_minutes).unwrap_or_else(Duration::zero)
    }
}

/// Produces bookable slots from a [`Resolver`].
pub struct Suggester<'r, 'a, S: ScheduleSource + ?Sized> {
    resolver: &'r Resolver<'a, S>,
    step: Duration,
}

impl<'r, 'a, S: ScheduleSource + ?Sized> Suggester<'r, 'a, S> {
    /// # Errors
    /// Returns `EngineError::InvalidStep` for a zero step.
    pub fn new(resolver: &'r Resolver<'a, S>, step_minutes: u32) -> Result<Self> {
        if step_minutes == 0 {
            return Err(EngineError::InvalidStep(step_minutes));
        }
        Ok(Self {
            resolver,
            step: Duration::minutes(i64::from(step_minutes)),
        })
    }

    /// Up to `request.limit` slots for one subject.
    ///
    /// `now` bounds the scan: no slot starts before it, and dates before its local
    /// date are skipped.
    ///
    /// # Errors
    /// Returns an `Invalid*` error for a malformed request and
    /// `EngineError::NoAvailabilityFound` if the whole horizon yields nothing.
    pub fn suggest(
        &self,
        subject: &Subject,
        request: &SuggestRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        self.scan(std::slice::from_ref(subject), request, now)
    }

    /// Slots where every subject (e.g. a surgeon and an operating room) is free at
    /// the same time.
    pub fn suggest_joint(
        &self,
        subjects: &[Subject],
        request: &SuggestRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        self.scan(subjects, request, now)
    }

    fn scan(
        &self,
        subjects: &[Subject],
        request: &SuggestRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<Interval>> {
        request.validate()?;

        let duration = request.duration();
        let today = self.resolver.calendar().local_date(now);
        let mut found = Vec::with_capacity(request.limit);

        let dates = request
            .start_date
            .iter_days()
            .take(request.horizon_days as usize);
        for date in dates {
            if date < today {
                continue;
            }
            let free = self.free_for_all(subjects, date);
            let not_before = (date == today).then_some(now);
            collect_candidates(&free, duration, self.step, not_before, request.limit, &mut found);
            if found.len() >= request.limit {
                break;
            }
        }

        tracing::debug!(
            subjects = subjects.len(),
            start_date = %request.start_date,
            horizon_days = request.horizon_days,
            found = found.len(),
            "slot scan finished"
        );

        if found.is_empty() {
            return Err(EngineError::no_availability(
                subjects,
                request.start_date,
                request.horizon_days,
            ));
        }
        Ok(found)
    }

    fn free_for_all(&self, subjects: &[Subject], date: NaiveDate) -> Vec<Interval> {
        let mut subjects = subjects.iter();
        let Some(first) = subjects.next() else {
            return Vec::new();
        };

        let mut free = self.resolver.resolve(first, date).free;
        for subject in subjects {
            if free.is_empty() {
                break;
            }
            free = intersect_all(&free, &self.resolver.resolve(subject, date).free);
        }
        free
    }
}

/// Append grid-aligned candidates from `free` to `out` until it holds `limit`.
fn collect_candidates(
    free: &[Interval],
    duration: Duration,
    step: Duration,
    not_before: Option<DateTime<Utc>>,
    limit: usize,
    out: &mut Vec<Interval>,
) {
    for window in free {
        if window.duration() < duration {
            continue;
        }

        let mut cursor = window.start;
        if let Some(now) = not_before.filter(|now| *now > window.start) {
            // Jump close to `now` on the grid, then step past it.
            let whole_steps = (now - window.start).num_seconds() / step.num_seconds();
            cursor = window.start + Duration::seconds(whole_steps * step.num_seconds());
            while cursor < now {
                cursor += step;
            }
        }

        while cursor + duration <= window.end {
            if out.len() >= limit {
                return;
            }
            out.push(Interval {
                start: cursor,
                end: cursor + duration,
                kind: IntervalKind::Free,
            });
            cursor += step;
        }
    }
}
