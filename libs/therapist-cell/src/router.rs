use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn therapist_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_therapists))
        .route("/{therapist_id}", get(handlers::get_therapist))
        .route("/{therapist_id}/consulting-hours", get(handlers::get_consulting_hours));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_therapist))
        .route("/{therapist_id}/consulting-hours", put(handlers::set_consulting_hours))
        .route("/{therapist_id}/schedules/generate", post(handlers::generate_schedules))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
