// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/book", post(handlers::book_slot))
        .route("/bookings/{request_id}/cancel", post(handlers::cancel_booking))
        .route("/{doctor_medical_id}", get(handlers::get_availability))
        .route("/{doctor_medical_id}", put(handlers::set_availability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
