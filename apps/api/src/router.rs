use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_request_cell::router::appointment_request_routes;
use availability_cell::router::availability_routes;
use directory_cell::router::directory_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareConnect API is running!" }))
        .nest("/directory", directory_routes(state.clone()))
        .nest("/appointment-requests", appointment_request_routes(state.clone()))
        .nest("/availability", availability_routes(state.clone()))
}
