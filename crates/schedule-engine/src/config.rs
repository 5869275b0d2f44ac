//! Engine configuration.
//!
//! The engine never reads files or the environment itself; front ends build an
//! [`EngineConfig`] (the CLI layers defaults, a TOML file and `SCHEDULE_*`
//! variables) and hand it in.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

/// Local-hour bounds outside of which a booking is flagged as an edge case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeHours {
    /// Bookings starting before this hour are flagged.
    pub early: u32,
    /// Bookings starting at or after this hour are flagged.
    pub late: u32,
}

impl Default for EdgeHours {
    fn default() -> Self {
        Self { early: 7, late: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone of the practice. Hours rules are wall-clock times in this zone.
    pub timezone: String,
    /// Granularity of suggested start times, in minutes.
    pub slot_step_minutes: u32,
    pub edge_hours: EdgeHours,
    pub dst_policy: DstPolicy,
    pub default_horizon_days: u32,
    pub default_limit: usize,
    /// Count past bookings never moved off `scheduled`/`confirmed` as no-shows.
    pub presume_stale_no_shows: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            slot_step_minutes: 30,
            edge_hours: EdgeHours::default(),
            dst_policy: DstPolicy::default(),
            default_horizon_days: 14,
            default_limit: 5,
            presume_stale_no_shows: false,
        }
    }
}

impl EngineConfig {
    /// Config for a practice in the given timezone, everything else default.
    pub fn with_timezone(timezone: &str) -> Self {
        Self {
            timezone: timezone.to_string(),
            ..Self::default()
        }
    }

    /// Parse the configured timezone.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if the name is not a known IANA zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(self.timezone.clone()))
    }

    /// Check the settings that would otherwise surface as odd results later.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.slot_step_minutes == 0 {
            return Err(EngineError::InvalidStep(self.slot_step_minutes));
        }
        if self.default_limit == 0 {
            return Err(EngineError::InvalidLimit);
        }
        if self.default_horizon_days == 0 {
            return Err(EngineError::InvalidHorizon);
        }
        Ok(())
    }
}
