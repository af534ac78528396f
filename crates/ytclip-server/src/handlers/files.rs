//! Listing of produced artifacts in the media directory.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<MediaFile>>> {
    let mut files = Vec::new();

    // A media directory that does not exist yet simply has no files
    let mut entries = match tokio::fs::read_dir(&state.media_dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(Json(files)),
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let metadata = entry.metadata().await?;
        let created_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        files.push(MediaFile {
            name: name.to_string(),
            size: metadata.len(),
            created_at,
            url: format!("/media/{}", name),
        });
    }

    files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(files))
}
