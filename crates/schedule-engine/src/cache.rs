//! Memoized per-(subject, date) availability.
//!
//! Every entry remembers the version string the caller passed when it was
//! computed (typically the last-modified timestamp of the underlying records).
//! A lookup with any other version recomputes; the cache never guesses whether
//! data changed.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::availability::{DayAvailability, Resolver};
use crate::model::Subject;
use crate::source::ScheduleSource;

#[derive(Debug, Clone)]
struct Entry {
    version: String,
    availability: DayAvailability,
}

#[derive(Debug, Clone, Default)]
pub struct AvailabilityCache {
    entries: HashMap<(Subject, NaiveDate), Entry>,
    hits: u64,
    misses: u64,
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached availability for `(subject, date)` at `version`, resolving on a miss
    /// or a version mismatch.
    pub fn get_or_resolve<S: ScheduleSource + ?Sized>(
        &mut self,
        resolver: &Resolver<'_, S>,
        subject: &Subject,
        date: NaiveDate,
        version: &str,
    ) -> DayAvailability {
        let key = (*subject, date);
        if let Some(entry) = self.entries.get(&key) {
            if entry.version == version {
                self.hits += 1;
                return entry.availability.clone();
            }
            tracing::trace!(%subject, %date, stale = %entry.version, version, "cache entry stale");
        }

        self.misses += 1;
        let availability = resolver.resolve(subject, date);
        self.entries.insert(
            key,
            Entry {
                version: version.to_string(),
                availability: availability.clone(),
            },
        );
        availability
    }

    /// Drop every entry for `subject`.
    pub fn invalidate(&mut self, subject: &Subject) {
        self.entries.retain(|(s, _), _| s != subject);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
