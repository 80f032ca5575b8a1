//! Router assembly

use axum::{http::StatusCode, middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::kubernetes::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected_routes = handlers::routes()
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}
