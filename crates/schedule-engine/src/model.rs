//! Domain records the engine consumes.
//!
//! These are the already-materialized rows handed over by the persistence layer.
//! The engine reads them, never mutates them, and never keeps them past one call.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::interval::{Interval, IntervalKind};

/// Identifier of a persisted record (booking, staff member, resource, absence, ...).
pub type RecordId = u64;

/// Whose time is being scheduled: a staff member or a bookable room/device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Staff(RecordId),
    Resource(RecordId),
}

impl Subject {
    pub fn is_staff(&self) -> bool {
        matches!(self, Subject::Staff(_))
    }

    pub fn id(&self) -> RecordId {
        match self {
            Subject::Staff(id) | Subject::Resource(id) => *id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Staff(id) => write!(f, "staff:{id}"),
            Subject::Resource(id) => write!(f, "resource:{id}"),
        }
    }
}

/// Parses the `staff:N` / `resource:N` form produced by `Display`.
impl FromStr for Subject {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidSubject(s.to_string());
        let (kind, id) = s.split_once(':').ok_or_else(invalid)?;
        let id: RecordId = id.trim().parse().map_err(|_| invalid())?;
        match kind.trim() {
            "staff" => Ok(Subject::Staff(id)),
            "resource" => Ok(Subject::Resource(id)),
            _ => Err(invalid()),
        }
    }
}

/// A weekly wall-clock rule: `[start_time, end_time)` every `weekday`.
///
/// Used for practice opening hours and for staff working hours. Times are local to
/// the practice timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl RecurringRule {
    pub fn new(weekday: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
        }
    }

    /// Build a rule from a weekday index, 0 = Monday through 6 = Sunday.
    pub fn from_index(weekday: u8, start_time: NaiveTime, end_time: NaiveTime) -> Option<Self> {
        let weekday = match weekday {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            6 => Weekday::Sun,
            _ => return None,
        };
        Some(Self::new(weekday, start_time, end_time))
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }
}

/// Working hours of one staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffHours {
    pub staff_id: RecordId,
    #[serde(flatten)]
    pub rule: RecurringRule,
}

fn active_default() -> bool {
    true
}

/// Whole-day unavailability (vacation, sick leave, maintenance), inclusive range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub id: RecordId,
    pub subject: Subject,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "active_default")]
    pub active: bool,
}

impl Absence {
    /// Active and `start_date <= date <= end_date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.active && self.start_date <= date && date <= self.end_date
    }
}

/// A one-off pause on a single date. `subject: None` applies to every staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Break {
    pub id: RecordId,
    #[serde(default)]
    pub subject: Option<Subject>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "active_default")]
    pub active: bool,
}

impl Break {
    /// Whether this break removes time from `subject`.
    ///
    /// Practice-wide breaks apply to staff only; rooms and devices are not sent on
    /// lunch.
    pub fn applies_to(&self, subject: &Subject) -> bool {
        match &self.subject {
            Some(own) => own == subject,
            None => subject.is_staff(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Appointment,
    Operation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested,
    #[default]
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    NoShow,
    Cancelled,
}

impl BookingStatus {
    /// Whether a booking in this status consumes the subject's time.
    pub fn is_occupying(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

/// An appointment or operation occupying a doctor and any attached rooms/devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: RecordId,
    pub kind: BookingKind,
    #[serde(default)]
    pub status: BookingStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Treating doctor, or primary surgeon for operations.
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub room_id: Option<RecordId>,
    #[serde(default)]
    pub device_ids: Vec<RecordId>,
}

impl Booking {
    pub fn appointment(
        id: RecordId,
        doctor_id: RecordId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: BookingKind::Appointment,
            status: BookingStatus::Scheduled,
            start,
            end,
            doctor_id: Some(doctor_id),
            room_id: None,
            device_ids: Vec::new(),
        }
    }

    /// An operation whose end is derived from the operation type's total duration.
    pub fn operation(
        id: RecordId,
        op_type: &OperationType,
        surgeon_id: RecordId,
        room_id: RecordId,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: BookingKind::Operation,
            status: BookingStatus::Scheduled,
            start,
            end: start + op_type.total_duration(),
            doctor_id: Some(surgeon_id),
            room_id: Some(room_id),
            device_ids: Vec::new(),
        }
    }

    pub fn with_room(mut self, room_id: RecordId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    pub fn is_occupying(&self) -> bool {
        self.status.is_occupying()
    }

    /// Whether the booking counts as a no-show at `now`.
    ///
    /// An explicit `NoShow` status always counts. With `presume_stale`, a booking
    /// that ended before `now` and is still `Scheduled` or `Confirmed` counts too.
    pub fn is_no_show(&self, now: DateTime<Utc>, presume_stale: bool) -> bool {
        match self.status {
            BookingStatus::NoShow => true,
            BookingStatus::Scheduled | BookingStatus::Confirmed => presume_stale && self.end <= now,
            _ => false,
        }
    }

    /// Whether this booking holds `subject` (as doctor, or as attached room/device).
    pub fn occupies(&self, subject: &Subject) -> bool {
        match subject {
            Subject::Staff(id) => self.doctor_id == Some(*id),
            Subject::Resource(id) => self.room_id == Some(*id) || self.device_ids.contains(id),
        }
    }

    /// The booked range as a `Booking` interval, `None` if malformed.
    pub fn interval(&self) -> Option<Interval> {
        Interval::try_new(self.start, self.end, IntervalKind::Booking)
    }

    pub fn entity_ref(&self) -> EntityRef {
        match self.kind {
            BookingKind::Appointment => EntityRef::Appointment(self.id),
            BookingKind::Operation => EntityRef::Operation(self.id),
        }
    }
}

/// Catalogue entry for an operation: preparation, the procedure itself, cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationType {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub prep_minutes: u32,
    pub op_minutes: u32,
    #[serde(default)]
    pub cleanup_minutes: u32,
}

impl OperationType {
    pub fn total_minutes(&self) -> u32 {
        self.prep_minutes + self.op_minutes + self.cleanup_minutes
    }

    pub fn total_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.total_minutes()))
    }
}

/// Reference to a record involved in a conflict, resolvable by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Appointment(RecordId),
    Operation(RecordId),
    Absence(RecordId),
}
