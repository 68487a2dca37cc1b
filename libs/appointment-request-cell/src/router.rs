// libs/appointment-request-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_request_routes(state: Arc<AppConfig>) -> Router {
    // Every request operation requires authentication.
    let protected_routes = Router::new()
        .route("/", post(handlers::create_request))
        .route("/stats", get(handlers::get_request_stats))
        .route("/doctor/{doctor_medical_id}", get(handlers::list_for_doctor))
        .route("/patient/{patient_medical_id}", get(handlers::list_for_patient))
        .route("/{request_id}", get(handlers::get_request))
        .route("/{request_id}/status", put(handlers::update_status))
        .route("/{request_id}/messages", post(handlers::add_message))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
