//! Tests for the batch conflict audit.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use schedule_engine::{
    detect_conflicts, Absence, Booking, BookingStatus, Conflict, ConflictDetector, ConflictKind,
    ConflictOwner, EngineConfig, EntityRef, OperationType, RecurringRule, Subject,
};

// ── Helpers ─────────────────────────────────────────────────────────────────

const ROOM: u64 = 50;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2026-03-16 is a Monday.
fn monday() -> NaiveDate {
    date(2026, 3, 16)
}

fn utc(d: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
}

fn open_all_week(start: u32, end: u32) -> Vec<RecurringRule> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .map(|w| {
        RecurringRule::new(
            w,
            NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        )
    })
    .collect()
}

fn appt(id: u64, doctor: u64, start: (u32, u32), end: (u32, u32)) -> Booking {
    let d = monday();
    Booking::appointment(id, doctor, utc(d, start.0, start.1), utc(d, end.0, end.1))
}

fn knee_surgery() -> OperationType {
    OperationType {
        id: 1,
        name: "Knee arthroscopy".to_string(),
        prep_minutes: 5,
        op_minutes: 40,
        cleanup_minutes: 5,
    }
}

fn detect(bookings: &[Booking]) -> Vec<Conflict> {
    ConflictDetector::new(&EngineConfig::default())
        .unwrap()
        .detect(bookings, &[], &open_all_week(7, 20))
}

fn of_kind(conflicts: &[Conflict], kind: ConflictKind) -> Vec<&Conflict> {
    conflicts.iter().filter(|c| c.kind == kind).collect()
}

// ── Pairwise rules ──────────────────────────────────────────────────────────

#[test]
fn operations_in_same_room_conflict() {
    // 50-minute operation at 10:00, another requested at 10:30 in the same room.
    let op_type = knee_surgery();
    let a = Booking::operation(1, &op_type, 100, ROOM, utc(monday(), 10, 0));
    let b = Booking::operation(2, &op_type, 101, ROOM, utc(monday(), 10, 30));
    assert_eq!(a.end, utc(monday(), 10, 50));

    let conflicts = detect(&[a, b]);

    assert_eq!(conflicts.len(), 1);
    let room = &conflicts[0];
    assert_eq!(room.kind, ConflictKind::RoomConflict);
    assert_eq!(room.owner, Some(ConflictOwner::Room(ROOM)));
    assert_eq!(room.hour_of_day, 10);
    assert_eq!(
        room.involved,
        vec![EntityRef::Operation(1), EntityRef::Operation(2)]
    );
}

#[test]
fn same_surgeon_same_room_reports_both_kinds() {
    let op_type = knee_surgery();
    let a = Booking::operation(1, &op_type, 100, ROOM, utc(monday(), 10, 0));
    let b = Booking::operation(2, &op_type, 100, ROOM, utc(monday(), 10, 30));

    let conflicts = detect(&[a, b]);

    assert_eq!(of_kind(&conflicts, ConflictKind::OperationOverlap).len(), 1);
    assert_eq!(of_kind(&conflicts, ConflictKind::RoomConflict).len(), 1);
    assert_eq!(
        of_kind(&conflicts, ConflictKind::OperationOverlap)[0].owner,
        Some(ConflictOwner::Doctor(100))
    );
}

#[test]
fn overlapping_appointments_of_one_doctor() {
    let conflicts = detect(&[appt(1, 7, (9, 0), (10, 0)), appt(2, 7, (9, 30), (10, 30))]);

    let doctor = of_kind(&conflicts, ConflictKind::DoctorConflict);
    assert_eq!(doctor.len(), 1);
    assert_eq!(doctor[0].owner, Some(ConflictOwner::Doctor(7)));
    assert_eq!(doctor[0].hour_of_day, 9);
}

#[test]
fn touching_appointments_do_not_conflict() {
    let conflicts = detect(&[appt(1, 7, (9, 0), (10, 0)), appt(2, 7, (10, 0), (11, 0))]);
    assert!(conflicts.is_empty());
}

#[test]
fn conflict_is_independent_of_input_order() {
    let a = appt(1, 7, (9, 0), (10, 0));
    let b = appt(2, 7, (9, 30), (10, 30));

    let forward = detect(&[a.clone(), b.clone()]);
    let backward = detect(&[b, a]);

    assert_eq!(forward, backward);
    assert_eq!(
        forward[0].involved,
        vec![EntityRef::Appointment(1), EntityRef::Appointment(2)]
    );
}

#[test]
fn long_booking_pairs_with_every_nested_one() {
    // 09-12 swallows 10:00-10:30 and 11:00-11:30; the two short ones do not touch.
    let conflicts = detect(&[
        appt(1, 7, (9, 0), (12, 0)),
        appt(2, 7, (10, 0), (10, 30)),
        appt(3, 7, (11, 0), (11, 30)),
    ]);

    let doctor = of_kind(&conflicts, ConflictKind::DoctorConflict);
    assert_eq!(doctor.len(), 2);
    assert!(doctor
        .iter()
        .all(|c| c.involved[0] == EntityRef::Appointment(1)));
}

#[test]
fn different_doctors_sharing_a_room() {
    let conflicts = detect(&[
        appt(1, 7, (9, 0), (10, 0)).with_room(ROOM),
        appt(2, 8, (9, 30), (10, 30)).with_room(ROOM),
    ]);

    let shared = of_kind(&conflicts, ConflictKind::AppointmentOverlap);
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].owner, Some(ConflictOwner::Room(ROOM)));
    assert!(of_kind(&conflicts, ConflictKind::DoctorConflict).is_empty());
}

#[test]
fn same_doctor_in_shared_room_is_only_a_doctor_conflict() {
    let conflicts = detect(&[
        appt(1, 7, (9, 0), (10, 0)).with_room(ROOM),
        appt(2, 7, (9, 30), (10, 30)).with_room(ROOM),
    ]);

    assert_eq!(of_kind(&conflicts, ConflictKind::DoctorConflict).len(), 1);
    assert!(of_kind(&conflicts, ConflictKind::AppointmentOverlap).is_empty());
}

#[test]
fn operation_and_appointment_sharing_a_room() {
    let op = Booking::operation(1, &knee_surgery(), 10, ROOM, utc(monday(), 10, 0));
    let visit = appt(2, 20, (10, 30), (11, 0)).with_room(ROOM);

    let conflicts = detect(&[op, visit]);

    assert_eq!(conflicts.len(), 1);
    let shared = &conflicts[0];
    assert_eq!(shared.kind, ConflictKind::AppointmentOverlap);
    assert_eq!(shared.owner, Some(ConflictOwner::Room(ROOM)));
    assert_eq!(
        shared.involved,
        vec![EntityRef::Operation(1), EntityRef::Appointment(2)]
    );
}

#[test]
fn doctor_booked_for_appointment_and_operation_is_not_a_pair_conflict() {
    // Overlap rules pair bookings of the same kind; mixing kinds for one doctor
    // is left to the resolver, which refuses the second slot.
    let op = Booking::operation(1, &knee_surgery(), 7, ROOM, utc(monday(), 10, 0));
    let visit = appt(2, 7, (10, 15), (10, 45));

    assert!(detect(&[op.clone(), visit.clone()]).is_empty());
    assert!(detect(&[op, visit.with_room(ROOM)]).is_empty());
}

// ── Single-booking rules ────────────────────────────────────────────────────

#[test]
fn booking_past_closing_time_violates_hours() {
    let opening = vec![RecurringRule::new(
        Weekday::Mon,
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )];
    let detector = ConflictDetector::new(&EngineConfig::default()).unwrap();

    let inside = appt(1, 7, (9, 0), (10, 0));
    let overrun = appt(2, 7, (17, 30), (18, 30));
    let conflicts = detector.detect(&[inside, overrun], &[], &opening);

    let violations = of_kind(&conflicts, ConflictKind::WorkingHoursViolation);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].involved, vec![EntityRef::Appointment(2)]);
}

#[test]
fn booking_on_closed_weekday_violates_hours() {
    let opening = vec![RecurringRule::new(
        Weekday::Mon,
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )];
    let tuesday = monday().succ_opt().unwrap();
    let booking = Booking::appointment(1, 7, utc(tuesday, 9, 0), utc(tuesday, 10, 0));

    let conflicts = ConflictDetector::new(&EngineConfig::default())
        .unwrap()
        .detect(&[booking], &[], &opening);

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::WorkingHoursViolation);
}

#[test]
fn booking_during_absence_flagged_only_inside_range() {
    let doctor = 7;
    let absence = Absence {
        id: 70,
        subject: Subject::Staff(doctor),
        start_date: date(2026, 1, 10),
        end_date: date(2026, 1, 20),
        active: true,
    };
    let jan15 = date(2026, 1, 15);
    let jan21 = date(2026, 1, 21);
    let bookings = vec![
        Booking::appointment(1, doctor, utc(jan15, 9, 0), utc(jan15, 9, 30)),
        Booking::appointment(2, doctor, utc(jan21, 9, 0), utc(jan21, 9, 30)),
    ];

    let conflicts = ConflictDetector::new(&EngineConfig::default())
        .unwrap()
        .detect(&bookings, &[absence], &open_all_week(7, 20));

    assert_eq!(conflicts.len(), 1);
    let absent = &conflicts[0];
    assert_eq!(absent.kind, ConflictKind::DoctorAbsent);
    assert_eq!(absent.date, jan15);
    assert_eq!(
        absent.involved,
        vec![EntityRef::Appointment(1), EntityRef::Absence(70)]
    );
}

#[test]
fn inactive_absence_not_flagged() {
    let jan15 = date(2026, 1, 15);
    let absence = Absence {
        id: 70,
        subject: Subject::Staff(7),
        start_date: date(2026, 1, 10),
        end_date: date(2026, 1, 20),
        active: false,
    };
    let booking = Booking::appointment(1, 7, utc(jan15, 9, 0), utc(jan15, 9, 30));

    let conflicts = ConflictDetector::new(&EngineConfig::default())
        .unwrap()
        .detect(&[booking], &[absence], &open_all_week(7, 20));

    assert!(conflicts.is_empty());
}

#[test]
fn early_and_late_starts_are_edge_cases() {
    let detector = ConflictDetector::new(&EngineConfig::default()).unwrap();
    let opening = open_all_week(0, 23);

    let bookings = vec![
        appt(1, 7, (6, 30), (7, 0)),
        appt(2, 7, (7, 0), (7, 30)),
        appt(3, 7, (19, 30), (20, 0)),
        appt(4, 7, (20, 0), (20, 30)),
    ];
    let conflicts = detector.detect(&bookings, &[], &opening);

    let edges: Vec<EntityRef> = of_kind(&conflicts, ConflictKind::EdgeCases)
        .iter()
        .flat_map(|c| c.involved.clone())
        .collect();
    assert_eq!(edges, vec![EntityRef::Appointment(1), EntityRef::Appointment(4)]);
}

#[test]
fn hour_of_day_uses_practice_timezone() {
    // 08:00 UTC is 09:00 in Berlin in March (before DST).
    let config = EngineConfig::with_timezone("Europe/Berlin");
    let conflicts = ConflictDetector::new(&config).unwrap().detect(
        &[appt(1, 7, (8, 0), (9, 0)), appt(2, 7, (8, 30), (9, 30))],
        &[],
        &open_all_week(7, 20),
    );

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].hour_of_day, 9);
}

// ── Data quality ────────────────────────────────────────────────────────────

#[test]
fn cancelled_and_malformed_bookings_are_skipped() {
    let reversed = Booking::appointment(3, 7, utc(monday(), 10, 0), utc(monday(), 9, 0));
    let conflicts = detect(&[
        appt(1, 7, (9, 0), (10, 0)),
        appt(2, 7, (9, 30), (10, 30)).with_status(BookingStatus::Cancelled),
        reversed,
    ]);

    assert!(conflicts.is_empty());
}

#[test]
fn convenience_wrapper_rejects_bad_timezone() {
    let config = EngineConfig::with_timezone("Nowhere/Special");
    assert!(detect_conflicts(&[], &[], &[], &config).is_err());
}

#[test]
fn empty_dataset_has_no_conflicts() {
    assert!(detect(&[]).is_empty());
}
