//! # schedule-engine
//!
//! Availability resolution, slot suggestion and conflict auditing for a medical
//! practice.
//!
//! The engine is a pure library: callers fetch opening hours, staff hours,
//! absences, breaks and bookings from their own store, hand them over through
//! [`ScheduleSource`] (or a [`ScheduleSnapshot`]), and get back free intervals,
//! suggested slots, or typed conflicts. Nothing here does I/O or keeps state
//! between calls, apart from the opt-in [`AvailabilityCache`].
//!
//! ## Modules
//!
//! - [`interval`] — Half-open intervals and set algebra (intersect, subtract, merge)
//! - [`materialize`] — Wall-clock rules → concrete UTC intervals in the practice timezone
//! - [`dst`] — DST gap handling for wall-clock boundaries
//! - [`availability`] — Per-subject, per-day free intervals
//! - [`suggest`] — Forward-scanning slot suggestions
//! - [`conflict`] — Batch audit of stored bookings
//! - [`metrics`] — Aggregates over audit results
//! - [`cache`] — Versioned per-(subject, date) memoization
//! - [`model`] / [`source`] — Input records and the persistence seam
//! - [`config`] / [`error`] — Configuration and error types

pub mod availability;
pub mod cache;
pub mod config;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod interval;
pub mod materialize;
pub mod metrics;
pub mod model;
pub mod source;
pub mod suggest;

pub use availability::{DayAvailability, HoursStatus, Resolver, SlotCheck};
pub use cache::AvailabilityCache;
pub use config::{EdgeHours, EngineConfig};
pub use conflict::{detect_conflicts, Conflict, ConflictDetector, ConflictKind, ConflictOwner};
pub use dst::DstPolicy;
pub use error::EngineError;
pub use interval::{intersect, intersect_all, merge_adjacent, subtract, subtract_all, Interval, IntervalKind};
pub use materialize::LocalCalendar;
pub use metrics::{no_show_count, ConflictMetrics, OwnerCount};
pub use model::{
    Absence, Booking, BookingKind, BookingStatus, Break, EntityRef, OperationType, RecordId,
    RecurringRule, StaffHours, Subject,
};
pub use source::{ScheduleSnapshot, ScheduleSource};
pub use suggest::{SuggestRequest, Suggester};
