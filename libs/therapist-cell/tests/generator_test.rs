use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use shared_config::{RegenerateMode, SchedulingConfig};
use shared_database::{MemoryStore, SchedulingStore, Transaction};
use shared_models::{ClockTime, ServiceError, Session, SessionStatus, TimeSlot};
use shared_utils::test_utils::ScheduleFixtures;
use therapist_cell::{SlotGeneratorService, TherapistService};

struct Harness {
    store: Arc<MemoryStore>,
    therapists: TherapistService,
    generator: SlotGeneratorService,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    Harness {
        therapists: TherapistService::with_store(store.clone()),
        generator: SlotGeneratorService::with_store(store.clone(), SchedulingConfig::default()),
        store,
    }
}

async fn therapist_with_weekday_hours(h: &Harness) -> Uuid {
    let therapist = h.therapists.create_therapist("Dr. Quiet", None).await.unwrap();
    h.therapists
        .set_consulting_hours(&therapist.id.to_string(), ScheduleFixtures::weekday_hours())
        .await
        .unwrap();
    therapist.id
}

#[tokio::test]
async fn generates_only_enabled_days() {
    let h = harness();
    let therapist_id = therapist_with_weekday_hours(&h).await;
    let monday = ScheduleFixtures::monday();

    let report = h
        .generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(7), None)
        .await
        .unwrap();

    assert_eq!(report.dates_written.len(), 5);
    assert_eq!(report.slots_generated, 5 * 6);
    assert!(report.orphaned_sessions.is_empty());

    let saturday = h.store.get_schedule(therapist_id, monday + Duration::days(5)).await.unwrap();
    assert!(saturday.is_none());

    let schedule = h.store.get_schedule(therapist_id, monday).await.unwrap().unwrap();
    assert_eq!(schedule.slots.len(), 6);
    assert!(schedule.slots.iter().all(|s| !s.overlaps(ClockTime::NOON, ClockTime::at(14, 0))));
}

#[tokio::test]
async fn therapist_without_hours_generates_nothing() {
    let h = harness();
    let therapist = h.therapists.create_therapist("Dr. Idle", None).await.unwrap();

    let report = h
        .generator
        .generate_schedules(&therapist.id.to_string(), ScheduleFixtures::monday(), None, None)
        .await
        .unwrap();

    assert_eq!(report.days, 30);
    assert!(report.dates_written.is_empty());
    assert_eq!(report.slots_generated, 0);
}

#[tokio::test]
async fn rejects_bad_input() {
    let h = harness();
    let monday = ScheduleFixtures::monday();

    assert_matches!(
        h.generator.generate_schedules("not-a-uuid", monday, None, None).await,
        Err(ServiceError::Validation(_))
    );
    assert_matches!(
        h.generator.generate_schedules(&Uuid::new_v4().to_string(), monday, None, None).await,
        Err(ServiceError::NotFound(_))
    );

    let therapist_id = therapist_with_weekday_hours(&h).await;
    assert_matches!(
        h.generator.generate_schedules(&therapist_id.to_string(), monday, Some(0), None).await,
        Err(ServiceError::Validation(_))
    );
}

#[tokio::test]
async fn range_past_last_calendar_date_is_rejected_without_writes() {
    let h = harness();
    let therapist_id = therapist_with_weekday_hours(&h).await;
    let last = NaiveDate::MAX;

    assert_matches!(
        h.generator.generate_schedules(&therapist_id.to_string(), last, Some(2), None).await,
        Err(ServiceError::Validation(_))
    );
    assert_matches!(
        h.generator
            .generate_schedules(&therapist_id.to_string(), last - Duration::days(10), Some(30), None)
            .await,
        Err(ServiceError::Validation(_))
    );
    assert!(h.store.get_schedule(therapist_id, last).await.unwrap().is_none());

    // A range ending exactly on the last date is still fine.
    let report = h
        .generator
        .generate_schedules(&therapist_id.to_string(), last - Duration::days(6), Some(7), None)
        .await
        .unwrap();
    assert_eq!(report.dates_written.len(), 5);
}

#[tokio::test]
async fn regenerating_is_deterministic() {
    let h = harness();
    let therapist_id = therapist_with_weekday_hours(&h).await;
    let monday = ScheduleFixtures::monday();

    h.generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(3), Some(RegenerateMode::Replace))
        .await
        .unwrap();
    let first = h.store.list_schedules(therapist_id, monday, monday + Duration::days(2)).await.unwrap();

    h.generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(3), Some(RegenerateMode::Replace))
        .await
        .unwrap();
    let second = h.store.list_schedules(therapist_id, monday, monday + Duration::days(2)).await.unwrap();

    let slots = |schedules: &[shared_models::Schedule]| -> Vec<Vec<TimeSlot>> {
        schedules.iter().map(|s| s.slots.clone()).collect()
    };
    assert_eq!(slots(&first), slots(&second));
    assert!(second.iter().all(|s| s.version == 2));
}

async fn book_directly(h: &Harness, therapist_id: Uuid, start: ClockTime) -> Session {
    let monday = ScheduleFixtures::monday();
    let mut schedule = h.store.get_schedule(therapist_id, monday).await.unwrap().unwrap();
    let slot = schedule.find_available_slot_mut(start).unwrap();
    let session = Session::pending(Uuid::new_v4(), therapist_id, monday, slot);
    slot.reserve(session.id);

    let mut tx = Transaction::new();
    tx.put_session(session.clone()).put_schedule(schedule);
    h.store.commit(tx).await.unwrap();
    session
}

#[tokio::test]
async fn preserve_mode_keeps_bookings_and_customizations() {
    let h = harness();
    let therapist_id = therapist_with_weekday_hours(&h).await;
    let monday = ScheduleFixtures::monday();

    h.generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(1), None)
        .await
        .unwrap();
    let session = book_directly(&h, therapist_id, ClockTime::at(10, 0)).await;

    let mut schedule = h.store.get_schedule(therapist_id, monday).await.unwrap().unwrap();
    schedule.slots.push(TimeSlot::custom(ClockTime::at(17, 0), ClockTime::at(18, 0)));
    let mut tx = Transaction::new();
    tx.put_schedule(schedule);
    h.store.commit(tx).await.unwrap();

    let report = h
        .generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(1), Some(RegenerateMode::Preserve))
        .await
        .unwrap();

    assert_eq!(report.preserved_slots, 2);
    assert!(report.orphaned_sessions.is_empty());

    let schedule = h.store.get_schedule(therapist_id, monday).await.unwrap().unwrap();
    assert_eq!(schedule.slots.len(), 7);
    assert_eq!(schedule.find_slot(ClockTime::at(10, 0)).unwrap().session_id, Some(session.id));
    assert!(schedule.find_slot(ClockTime::at(17, 0)).unwrap().is_customized);
}

#[tokio::test]
async fn replace_mode_reports_orphaned_live_sessions() {
    let h = harness();
    let therapist_id = therapist_with_weekday_hours(&h).await;
    let monday = ScheduleFixtures::monday();

    h.generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(1), None)
        .await
        .unwrap();
    let live = book_directly(&h, therapist_id, ClockTime::at(9, 0)).await;
    let booked = book_directly(&h, therapist_id, ClockTime::at(15, 0)).await;
    let mut cancelled = h.store.get_session(booked.id).await.unwrap().unwrap();
    cancelled.status = SessionStatus::Cancelled;
    let mut tx = Transaction::new();
    tx.put_session(cancelled);
    h.store.commit(tx).await.unwrap();

    let report = h
        .generator
        .generate_schedules(&therapist_id.to_string(), monday, Some(1), Some(RegenerateMode::Replace))
        .await
        .unwrap();

    assert_eq!(report.orphaned_sessions.len(), 1);
    assert_eq!(report.orphaned_sessions[0].session_id, live.id);
    assert_eq!(report.orphaned_sessions[0].start_time, ClockTime::at(9, 0));

    let schedule = h.store.get_schedule(therapist_id, monday).await.unwrap().unwrap();
    assert!(schedule.slots.iter().all(|s| s.is_available && s.session_id.is_none()));
}
