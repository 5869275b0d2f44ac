//! DST transition policies for wall-clock schedule boundaries.

use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for wall-clock times that do not exist on a given day.
///
/// Opening hours are declared as local times ("08:00"), so a boundary can land in
/// the gap of a spring-forward transition. Ambiguous times (fall-back) always
/// resolve to the earlier instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop the boundary; the rule does not materialize on that day.
    Skip,
    /// Move to the first valid local time after the gap.
    #[default]
    ShiftForward,
}

/// Longest DST gap we search across when shifting forward.
const MAX_GAP_MINUTES: i64 = 180;

/// Resolve a local wall-clock time in `tz` to a UTC instant under `policy`.
pub fn resolve_local(tz: &Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES).find_map(|m| {
                tz.from_local_datetime(&(local + Duration::minutes(m)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
        },
    }
}
