use assert_matches::assert_matches;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::json;

use schedule_cell::handlers::*;
use schedule_cell::models::*;
use shared_database::{AppState, SchedulingStore, Transaction};
use shared_models::error::AppError;
use shared_models::Therapist;
use shared_utils::test_utils::{ScheduleFixtures, TestConfig, TestUser};

async fn state_with_therapist() -> (AppState, String) {
    let state = TestConfig::default().to_state();
    let therapist = Therapist::new("Dr. Hush", None);
    let id = therapist.id.to_string();

    let mut tx = Transaction::new();
    tx.put_therapist(therapist);
    state.store.commit(tx).await.unwrap();

    (state, id)
}

fn admin() -> Extension<shared_models::auth::User> {
    Extension(TestUser::admin("admin@example.com").to_user())
}

#[tokio::test]
async fn admin_adds_slot_then_public_query_sees_it() {
    let (state, id) = state_with_therapist().await;
    let date = ScheduleFixtures::monday().to_string();

    let request: AddSlotRequest = serde_json::from_value(json!({
        "startTime": "06:00 PM",
        "endTime": "07:00 PM"
    }))
    .unwrap();

    add_custom_slot(State(state.clone()), Path((id.clone(), date.clone())), admin(), Json(request))
        .await
        .unwrap();

    let Json(day) = get_day_schedule(
        State(state.clone()),
        Path(id.clone()),
        Query(DayScheduleQuery { date: date.clone() }),
    )
    .await
    .unwrap();

    assert_eq!(day["date"], date);
    assert_eq!(day["slots"][0]["startTime"], "06:00 PM");
    assert_eq!(day["slots"][0]["isCustomized"], true);

    let Json(range) = get_schedule_range(
        State(state),
        Path(id),
        Query(ScheduleRangeQuery {
            from: date.clone(),
            to: date,
            available_only: true,
        }),
    )
    .await
    .unwrap();
    assert_eq!(range["total"], 1);
}

#[tokio::test]
async fn clients_cannot_edit_slots() {
    let (state, id) = state_with_therapist().await;
    let client = Extension(TestUser::client("client@example.com").to_user());

    let result = delete_slot(
        State(state),
        Path((id, ScheduleFixtures::monday().to_string())),
        Query(DeleteSlotQuery {
            start_time: shared_models::ClockTime::at(9, 0),
        }),
        client,
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn update_request_accepts_partial_changes() {
    let request: UpdateSlotRequest = serde_json::from_value(json!({
        "startTime": "09:00 AM",
        "changes": { "isAvailable": false }
    }))
    .unwrap();

    assert_eq!(request.changes.is_available, Some(false));
    assert!(request.changes.start_time.is_none());

    let missing_changes: UpdateSlotRequest = serde_json::from_value(json!({ "startTime": "09:00 AM" })).unwrap();
    assert!(missing_changes.changes.is_available.is_none());
}
