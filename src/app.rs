use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, imports, prices};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/prices", prices::router())
        .nest("/api/imports", imports::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
