//! Job status queries, the fallback for subscribers that connect late.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use ytclip_core::registry::Job;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.extractor.registry().list())
}

pub async fn get(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    state
        .extractor
        .registry()
        .get(job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {}", job_id)))
}
