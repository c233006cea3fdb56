use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_admin;

use crate::models::{BookSessionRequest, TherapistSessionsQuery, UpdateSessionStatusRequest};
use crate::services::{BookingService, CancellationService, SessionLifecycleService};

#[axum::debug_handler]
pub async fn book_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let session = BookingService::new(&state)
        .create_session(&user.id, &request.therapist_id, &request.date, &request.start_time)
        .await?;

    Ok(Json(json!({
        "success": true,
        "session": session
    })))
}

#[axum::debug_handler]
pub async fn list_my_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let sessions = SessionLifecycleService::new(&state).list_user_sessions(&user.id).await?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = SessionLifecycleService::new(&state).get_session(&session_id).await?;

    if !user.is_admin() && session.user_id.to_string() != user.id {
        return Err(AppError::Forbidden("Not allowed to view this session".to_string()));
    }

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = CancellationService::new(&state);

    let session = if user.is_admin() {
        service.cancel_session_as_admin(&session_id).await?
    } else {
        service.cancel_session(&session_id, &user.id).await?
    };

    Ok(Json(json!({
        "success": true,
        "session": session
    })))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn update_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateSessionStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let session = SessionLifecycleService::new(&state)
        .update_session_status(&session_id, request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "session": session
    })))
}

#[axum::debug_handler]
pub async fn list_therapist_sessions(
    State(state): State<AppState>,
    Path(therapist_id): Path<String>,
    Query(query): Query<TherapistSessionsQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;

    let sessions = SessionLifecycleService::new(&state)
        .list_therapist_sessions(&therapist_id, query.date.as_deref())
        .await?;

    Ok(Json(json!({
        "therapistId": therapist_id,
        "sessions": sessions,
        "total": sessions.len()
    })))
}
