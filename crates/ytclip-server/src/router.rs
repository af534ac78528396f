//! Application router
//!
//! Shared by the binary and the integration tests so both run the same
//! route table and middleware stack.

use axum::http::header::{ACCEPT_RANGES, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, RANGE])
        .expose_headers([CONTENT_RANGE, ACCEPT_RANGES]);

    Router::new()
        .route("/api/extract", axum::routing::post(handlers::extract::start))
        // Compatibility alias; accepted both verbs historically
        .route(
            "/api/convert",
            get(handlers::extract::start_from_query).post(handlers::extract::start),
        )
        .route("/api/progress/{job_id}", get(handlers::progress::stream))
        .route("/api/jobs", get(handlers::jobs::list))
        .route("/api/jobs/{job_id}", get(handlers::jobs::get))
        .route("/api/status", get(handlers::status::status))
        .route("/api/files", get(handlers::files::list))
        .route(
            "/api/recordings",
            get(handlers::recordings::list).post(handlers::recordings::create),
        )
        .route(
            "/api/recordings/{id}",
            get(handlers::recordings::get)
                .put(handlers::recordings::update)
                .delete(handlers::recordings::delete),
        )
        // Byte-range serving of produced artifacts
        .nest_service("/media", ServeDir::new(&state.media_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
