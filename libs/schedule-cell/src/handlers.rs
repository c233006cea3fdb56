use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{AddSlotRequest, DayScheduleQuery, DeleteSlotQuery, ScheduleRangeQuery, UpdateSlotRequest};
use crate::services::{CustomSlotService, ScheduleQueryService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_day_schedule(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    Query(query): Query<DayScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let schedule = ScheduleQueryService::new(&state)
        .get_schedule_for_date(&therapist_id, &query.date)
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn get_schedule_range(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    Query(query): Query<ScheduleRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let schedules = ScheduleQueryService::new(&state)
        .get_schedules_in_range(&therapist_id, &query.from, &query.to, query.available_only)
        .await?;

    Ok(Json(json!({
        "therapistId": therapist_id,
        "schedules": schedules,
        "total": schedules.len()
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_custom_slot(
    State(state): State<AppState>,
    Path((therapist_id, date)): Path<(String, String)>,
    Extension(user): Extension<User>,
    Json(request): Json<AddSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let schedule = CustomSlotService::new(&state)
        .add_custom_slot(&therapist_id, &date, request.start_time, request.end_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn update_slot(
    State(state): State<AppState>,
    Path((therapist_id, date)): Path<(String, String)>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let schedule = CustomSlotService::new(&state)
        .update_slot(&therapist_id, &date, request.start_time, request.changes)
        .await?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<AppState>,
    Path((therapist_id, date)): Path<(String, String)>,
    Query(query): Query<DeleteSlotQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let schedule = CustomSlotService::new(&state)
        .delete_slot(&therapist_id, &date, query.start_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "schedule": schedule
    })))
}
