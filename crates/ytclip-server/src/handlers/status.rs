//! Service health and feature flags.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub tool: ToolStatus,
    pub relay: bool,
    pub catalog: bool,
    pub active_jobs: usize,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let tool = match state.extractor.probe().await {
        Ok(version) => ToolStatus {
            available: true,
            version: Some(version),
        },
        Err(_) => ToolStatus {
            available: false,
            version: None,
        },
    };

    Json(StatusResponse {
        status: "ok",
        tool,
        relay: state.extractor.relay_configured(),
        catalog: state.catalog.is_some(),
        active_jobs: state.extractor.registry().active_count(),
    })
}
