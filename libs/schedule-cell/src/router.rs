use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/{therapist_id}", get(handlers::get_day_schedule))
        .route("/{therapist_id}/range", get(handlers::get_schedule_range));

    let protected_routes = Router::new()
        .route(
            "/{therapist_id}/{date}/slots",
            post(handlers::add_custom_slot)
                .put(handlers::update_slot)
                .delete(handlers::delete_slot),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
