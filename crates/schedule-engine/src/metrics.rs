//! Aggregates over a conflict audit: counts, rate, hour/weekday distribution and
//! the owners with the most conflicts.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::conflict::{Conflict, ConflictKind, ConflictOwner};
use crate::model::Booking;

/// Conflict count for one doctor or room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerCount {
    pub owner: ConflictOwner,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictMetrics {
    pub total: usize,
    /// Every kind is present, zero or not.
    pub by_kind: BTreeMap<ConflictKind, usize>,
    /// Bookings plus operations the rate is measured against.
    pub plannings: usize,
    /// Conflicts per 100 plannings; 0 when there are no plannings.
    pub rate_per_100: f64,
    /// Index = local hour of day.
    pub by_hour: [usize; 24],
    /// Index = weekday, Monday first.
    pub by_weekday: [usize; 7],
    /// Owners sorted by descending count, ties by owner.
    pub ranking: Vec<OwnerCount>,
}

impl ConflictMetrics {
    pub fn from_conflicts(conflicts: &[Conflict], plannings: usize) -> Self {
        let mut by_kind: BTreeMap<ConflictKind, usize> =
            ConflictKind::ALL.iter().map(|k| (*k, 0)).collect();
        let mut by_hour = [0usize; 24];
        let mut by_weekday = [0usize; 7];
        let mut per_owner: HashMap<ConflictOwner, usize> = HashMap::new();

        for conflict in conflicts {
            *by_kind.entry(conflict.kind).or_default() += 1;
            if let Some(slot) = by_hour.get_mut(conflict.hour_of_day as usize) {
                *slot += 1;
            }
            by_weekday[conflict.date.weekday().num_days_from_monday() as usize] += 1;
            if let Some(owner) = conflict.owner {
                *per_owner.entry(owner).or_default() += 1;
            }
        }

        let mut ranking: Vec<OwnerCount> = per_owner
            .into_iter()
            .map(|(owner, count)| OwnerCount { owner, count })
            .collect();
        ranking.sort_by(|a, b| b.count.cmp(&a.count).then(a.owner.cmp(&b.owner)));

        let rate_per_100 = if plannings > 0 {
            conflicts.len() as f64 / plannings as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total: conflicts.len(),
            by_kind,
            plannings,
            rate_per_100,
            by_hour,
            by_weekday,
            ranking,
        }
    }

    pub fn count(&self, kind: ConflictKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// The `n` owners with the most conflicts.
    pub fn top_owners(&self, n: usize) -> &[OwnerCount] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    /// Flatten into `key -> number`.
    ///
    /// Keys: `total`, `plannings`, `rate_per_100`, one per kind name,
    /// `hour_00`..`hour_23`, `weekday_mon`..`weekday_sun`.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

        let mut map = BTreeMap::new();
        map.insert("total".to_string(), self.total as f64);
        map.insert("plannings".to_string(), self.plannings as f64);
        map.insert("rate_per_100".to_string(), self.rate_per_100);
        for (kind, count) in &self.by_kind {
            map.insert(kind.as_str().to_string(), *count as f64);
        }
        for (hour, count) in self.by_hour.iter().enumerate() {
            map.insert(format!("hour_{hour:02}"), *count as f64);
        }
        for (name, count) in WEEKDAYS.iter().zip(self.by_weekday.iter()) {
            map.insert(format!("weekday_{name}"), *count as f64);
        }
        map
    }
}

/// Number of well-formed bookings that count as no-shows at `now`.
///
/// See [`Booking::is_no_show`] for what `presume_stale` changes.
pub fn no_show_count(bookings: &[Booking], now: DateTime<Utc>, presume_stale: bool) -> usize {
    bookings
        .iter()
        .filter(|b| b.is_well_formed() && b.is_no_show(now, presume_stale))
        .count()
}
