// libs/directory-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn directory_routes(state: Arc<AppConfig>) -> Router {
    // Registration stays open; everything else requires a valid token.
    let public_routes = Router::new()
        .route("/users", post(handlers::register_user));

    let protected_routes = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/{medical_id}", get(handlers::get_user))
        .route("/users/{medical_id}", put(handlers::update_profile))
        .route("/doctors", get(handlers::list_doctors))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
