//! Error types for schedule-engine operations.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::Subject;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid interval: start {start} is not before end {end}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid duration: {0} minutes (must be positive)")]
    InvalidDuration(i64),

    #[error("Invalid limit: must request at least one slot")]
    InvalidLimit,

    #[error("Invalid horizon: must scan at least one day")]
    InvalidHorizon,

    #[error("Invalid slot step: {0} minutes (must be positive)")]
    InvalidStep(u32),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid subject: {0} (expected staff:<id> or resource:<id>)")]
    InvalidSubject(String),

    #[error("No availability found for {subject} within {horizon_days} days from {from}")]
    NoAvailabilityFound {
        subject: String,
        from: NaiveDate,
        horizon_days: u32,
    },
}

impl EngineError {
    pub(crate) fn no_availability(subjects: &[Subject], from: NaiveDate, horizon_days: u32) -> Self {
        let subject = subjects
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        EngineError::NoAvailabilityFound {
            subject,
            from,
            horizon_days,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
