//! Recording catalog CRUD, proxied to the configured catalog store.
//!
//! Every route answers 503 `CATALOG_UNCONFIGURED` when the `[catalog]`
//! config table is absent.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ytclip_core::catalog::{CatalogStore, Pagination, Recording, RecordingPatch};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct RecordingPageResponse {
    pub items: Vec<Recording>,
    pub pagination: Pagination,
}

fn catalog(state: &AppState) -> ApiResult<Arc<dyn CatalogStore>> {
    state.catalog.clone().ok_or(ApiError::CatalogUnconfigured)
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecordingPageResponse>> {
    let page = catalog(&state)?.list(params.page).await?;
    Ok(Json(RecordingPageResponse {
        items: page.items,
        pagination: page.pagination,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(recording): Json<Recording>,
) -> ApiResult<Json<Value>> {
    let created = catalog(&state)?.create(&recording).await?;
    Ok(Json(json!({ "success": true, "recording": created })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Recording>> {
    Ok(Json(catalog(&state)?.get(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<RecordingPatch>,
) -> ApiResult<Json<Value>> {
    let updated = catalog(&state)?.update(id, &patch).await?;
    Ok(Json(json!({ "success": true, "recording": updated })))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    catalog(&state)?.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
