use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{CreateTherapistRequest, GenerateSchedulesRequest, SetConsultingHoursRequest};
use crate::services::{SlotGeneratorService, TherapistService};

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_therapists(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let therapists = TherapistService::new(&state).list_therapists().await?;

    Ok(Json(json!({
        "therapists": therapists,
        "total": therapists.len()
    })))
}

#[axum::debug_handler]
pub async fn get_therapist(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let therapist = TherapistService::new(&state).get_therapist(&therapist_id).await?;
    Ok(Json(json!(therapist)))
}

#[axum::debug_handler]
pub async fn get_consulting_hours(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let hours = TherapistService::new(&state).get_consulting_hours(&therapist_id).await?;

    Ok(Json(json!({
        "therapistId": therapist_id,
        "consultingHours": hours
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_therapist(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTherapistRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let therapist = TherapistService::new(&state)
        .create_therapist(&request.name, request.email)
        .await?;

    Ok(Json(json!({
        "success": true,
        "therapist": therapist
    })))
}

#[axum::debug_handler]
pub async fn set_consulting_hours(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<SetConsultingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let therapist = TherapistService::new(&state)
        .set_consulting_hours(&therapist_id, request.consulting_hours)
        .await?;

    Ok(Json(json!({
        "success": true,
        "therapistId": therapist.id,
        "consultingHours": therapist.consulting_hours
    })))
}

#[axum::debug_handler]
pub async fn generate_schedules(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<GenerateSchedulesRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let report = SlotGeneratorService::new(&state)
        .generate_schedules(&therapist_id, request.start_date, request.days, request.mode)
        .await?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
