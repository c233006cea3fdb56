use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn session_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::book_session))
        .route("/mine", get(handlers::list_my_sessions))
        .route("/therapist/{therapist_id}", get(handlers::list_therapist_sessions))
        .route("/{session_id}", get(handlers::get_session))
        .route("/{session_id}/cancel", post(handlers::cancel_session))
        .route("/{session_id}/status", patch(handlers::update_session_status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
