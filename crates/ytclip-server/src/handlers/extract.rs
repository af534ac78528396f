//! Extraction acceptance endpoint
//!
//! Validation and the tool probe happen synchronously here; everything
//! after the returned acknowledgment is reported over the progress
//! stream, never through this response.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ytclip_core::ExtractionRequest;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractParams {
    #[serde(default)]
    pub url: Option<String>,
    // The query form historically used bare `start`/`end`
    #[serde(default, alias = "start")]
    pub start_time: Option<String>,
    #[serde(default, alias = "end")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub message: String,
    pub progress_url: String,
}

pub async fn start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(params): Json<ExtractParams>,
) -> ApiResult<Json<ExtractResponse>> {
    accept(state, headers, params).await
}

pub async fn start_from_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ExtractParams>,
) -> ApiResult<Json<ExtractResponse>> {
    accept(state, headers, params).await
}

async fn accept(
    state: AppState,
    headers: HeaderMap,
    params: ExtractParams,
) -> ApiResult<Json<ExtractResponse>> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let accepted = state
        .extractor
        .start(ExtractionRequest {
            url: params.url.unwrap_or_default(),
            start_time: params.start_time,
            end_time: params.end_time,
            title: params.title,
            host,
        })
        .await?;

    Ok(Json(ExtractResponse {
        success: true,
        job_id: accepted.job_id,
        message: "Extraction started".to_string(),
        progress_url: format!("/api/progress/{}", accepted.job_id),
    }))
}
