use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{healthz, readyz, submit_image, submit_measurement};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/v1/measurement", post(submit_measurement))
        .route("/api/v1/image", post(submit_image))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
