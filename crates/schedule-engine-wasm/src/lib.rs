//! WASM bindings for schedule-engine.
//!
//! Exposes availability resolution, slot suggestion, slot checks and the conflict
//! audit to JavaScript via `wasm-bindgen`. Complex values cross the boundary as
//! JSON strings: the schedule snapshot in, the engine's own serde output back.
//!
//! Every export takes an optional `config_json` (an `EngineConfig` object, any
//! field may be omitted); `undefined` means defaults.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p schedule-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/schedule_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use schedule_engine::{
    Conflict, ConflictDetector, ConflictMetrics, EngineConfig, Interval, IntervalKind, Resolver,
    ScheduleSnapshot, Subject, SuggestRequest, Suggester,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive `YYYY-MM-DDTHH:MM:SS`, read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    s.parse()
        .map_err(|e| format!("Invalid date '{}': {}", s, e))
}

fn parse_snapshot(json: &str) -> Result<ScheduleSnapshot, String> {
    ScheduleSnapshot::from_json(json).map_err(|e| format!("Invalid snapshot JSON: {}", e))
}

fn parse_config(json: Option<&str>) -> Result<EngineConfig, String> {
    let config: EngineConfig = match json {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| format!("Invalid config JSON: {}", e))?
        }
        None => EngineConfig::default(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn parse_subject(s: &str) -> Result<Subject, String> {
    s.trim().parse::<Subject>().map_err(|e| e.to_string())
}

/// `"staff:1"` or a comma-separated list like `"staff:1,resource:50"`.
fn parse_subjects(s: &str) -> Result<Vec<Subject>, String> {
    s.split(',').map(parse_subject).collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

// ---------------------------------------------------------------------------
// Operations (plain Rust, testable off-wasm)
// ---------------------------------------------------------------------------

fn resolve_day_impl(
    snapshot_json: &str,
    subject: &str,
    date: &str,
    config_json: Option<&str>,
) -> Result<String, String> {
    let config = parse_config(config_json)?;
    let snapshot = parse_snapshot(snapshot_json)?;
    let subject = parse_subject(subject)?;
    let date = parse_date(date)?;

    let resolver = Resolver::new(&snapshot, &config).map_err(|e| e.to_string())?;
    to_json(&resolver.resolve(&subject, date))
}

#[allow(clippy::too_many_arguments)]
fn suggest_slots_impl(
    snapshot_json: &str,
    subjects: &str,
    start_date: &str,
    duration_minutes: u32,
    limit: Option<u32>,
    horizon_days: Option<u32>,
    now: &str,
    config_json: Option<&str>,
) -> Result<String, String> {
    let config = parse_config(config_json)?;
    let snapshot = parse_snapshot(snapshot_json)?;
    let subjects = parse_subjects(subjects)?;
    let now = parse_datetime(now)?;

    let request = SuggestRequest::new(
        parse_date(start_date)?,
        i64::from(duration_minutes),
        limit.map_or(config.default_limit, |l| l as usize),
        horizon_days.unwrap_or(config.default_horizon_days),
    );

    let resolver = Resolver::new(&snapshot, &config).map_err(|e| e.to_string())?;
    let suggester =
        Suggester::new(&resolver, config.slot_step_minutes).map_err(|e| e.to_string())?;
    let slots = suggester
        .suggest_joint(&subjects, &request, now)
        .map_err(|e| e.to_string())?;
    to_json(&slots)
}

fn check_slot_impl(
    snapshot_json: &str,
    subject: &str,
    start: &str,
    end: &str,
    config_json: Option<&str>,
) -> Result<String, String> {
    let config = parse_config(config_json)?;
    let snapshot = parse_snapshot(snapshot_json)?;
    let subject = parse_subject(subject)?;
    let slot = Interval::new(parse_datetime(start)?, parse_datetime(end)?, IntervalKind::Free)
        .map_err(|e| e.to_string())?;

    let resolver = Resolver::new(&snapshot, &config).map_err(|e| e.to_string())?;
    to_json(&resolver.check_slot(&subject, &slot))
}

fn detect_conflicts_impl(snapshot_json: &str, config_json: Option<&str>) -> Result<String, String> {
    let config = parse_config(config_json)?;
    let snapshot = parse_snapshot(snapshot_json)?;

    let detector = ConflictDetector::new(&config).map_err(|e| e.to_string())?;
    let conflicts = detector.detect(&snapshot.bookings, &snapshot.absences, &snapshot.opening_hours);
    to_json(&conflicts)
}

fn conflict_metrics_impl(conflicts_json: &str, plannings: u32) -> Result<String, String> {
    let conflicts: Vec<Conflict> = serde_json::from_str(conflicts_json)
        .map_err(|e| format!("Invalid conflicts JSON: {}", e))?;
    to_json(&ConflictMetrics::from_conflicts(&conflicts, plannings as usize))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

fn js_err(message: String) -> JsValue {
    JsValue::from_str(&message)
}

/// Free intervals of one subject on one local date.
///
/// Returns a JSON `DayAvailability`: `{subject, date, status, free: [{start, end, kind}]}`.
///
/// # Arguments
/// - `snapshot_json` -- opening hours, staff hours, absences, breaks and bookings
/// - `subject` -- `"staff:<id>"` or `"resource:<id>"`
/// - `date` -- local date, `YYYY-MM-DD`
#[wasm_bindgen(js_name = "resolveDay")]
pub fn resolve_day(
    snapshot_json: &str,
    subject: &str,
    date: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    resolve_day_impl(snapshot_json, subject, date, config_json.as_deref()).map_err(js_err)
}

/// Bookable slots of `duration_minutes`, earliest first.
///
/// `subjects` may list several comma-separated subjects; slots are then those where
/// all of them are free. `now` (ISO 8601) bounds the scan from below. Throws when
/// the horizon yields no slot.
#[wasm_bindgen(js_name = "suggestSlots")]
#[allow(clippy::too_many_arguments)]
pub fn suggest_slots(
    snapshot_json: &str,
    subjects: &str,
    start_date: &str,
    duration_minutes: u32,
    limit: Option<u32>,
    horizon_days: Option<u32>,
    now: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    suggest_slots_impl(
        snapshot_json,
        subjects,
        start_date,
        duration_minutes,
        limit,
        horizon_days,
        now,
        config_json.as_deref(),
    )
    .map_err(js_err)
}

/// Classify a proposed slot: `"bookable"`, `"outside_hours"`,
/// `"no_declared_hours"` or `"occupied"` (returned as a JSON string).
#[wasm_bindgen(js_name = "checkSlot")]
pub fn check_slot(
    snapshot_json: &str,
    subject: &str,
    start: &str,
    end: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    check_slot_impl(snapshot_json, subject, start, end, config_json.as_deref()).map_err(js_err)
}

/// Audit every booking in the snapshot. Returns a JSON array of conflicts.
#[wasm_bindgen(js_name = "detectConflicts")]
pub fn detect_conflicts(snapshot_json: &str, config_json: Option<String>) -> Result<String, JsValue> {
    detect_conflicts_impl(snapshot_json, config_json.as_deref()).map_err(js_err)
}

/// Aggregate the output of `detectConflicts` against `plannings` bookings.
#[wasm_bindgen(js_name = "conflictMetrics")]
pub fn conflict_metrics(conflicts_json: &str, plannings: u32) -> Result<String, JsValue> {
    conflict_metrics_impl(conflicts_json, plannings).map_err(js_err)
}
