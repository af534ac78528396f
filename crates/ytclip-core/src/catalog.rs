//! Recording catalog over a PostgREST-style row API
//!
//! Rows use snake_case column names; the crate's own API surface uses
//! camelCase, so payloads are mapped explicitly in both directions.

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

pub const PAGE_SIZE: u32 = 20;

/// One catalog record describing a produced artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub date: String,
    pub media_reference: String,
    #[serde(default)]
    pub aux_reference: String,
}

/// Partial update; only the provided fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    pub media_reference: Option<String>,
    pub aux_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub items_per_page: u32,
}

#[derive(Debug, Clone)]
pub struct RecordingPage {
    pub items: Vec<Recording>,
    pub pagination: Pagination,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list(&self, page: u32) -> Result<RecordingPage, CatalogError>;
    async fn create(&self, recording: &Recording) -> Result<Recording, CatalogError>;
    async fn get(&self, id: i64) -> Result<Recording, CatalogError>;
    async fn update(&self, id: i64, patch: &RecordingPatch) -> Result<Recording, CatalogError>;
    async fn delete(&self, id: i64) -> Result<(), CatalogError>;
}

#[derive(Debug, Deserialize)]
struct RecordingRow {
    id: Option<i64>,
    title: String,
    date: String,
    media_reference: String,
    #[serde(default)]
    aux_reference: String,
}

impl From<RecordingRow> for Recording {
    fn from(row: RecordingRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            date: row.date,
            media_reference: row.media_reference,
            aux_reference: row.aux_reference,
        }
    }
}

fn row_payload(recording: &Recording) -> serde_json::Value {
    json!({
        "title": recording.title,
        "date": recording.date,
        "media_reference": recording.media_reference,
        "aux_reference": recording.aux_reference,
    })
}

fn patch_payload(patch: &RecordingPatch) -> serde_json::Value {
    let mut row = serde_json::Map::new();
    if let Some(title) = &patch.title {
        row.insert("title".to_string(), json!(title));
    }
    if let Some(date) = &patch.date {
        row.insert("date".to_string(), json!(date));
    }
    if let Some(media_reference) = &patch.media_reference {
        row.insert("media_reference".to_string(), json!(media_reference));
    }
    if let Some(aux_reference) = &patch.aux_reference {
        row.insert("aux_reference".to_string(), json!(aux_reference));
    }
    serde_json::Value::Object(row)
}

/// `Content-Range: 0-19/57` carries the exact total after the slash.
fn parse_content_range_total(header: Option<&str>) -> Option<u64> {
    header?.rsplit('/').next()?.parse().ok()
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(CatalogError::Rejected { status, body })
    }
}

/// PostgREST row API client.
pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
    key: String,
    table: String,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            table: config.table.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

#[async_trait]
impl CatalogStore for HttpCatalog {
    async fn list(&self, page: u32) -> Result<RecordingPage, CatalogError> {
        let page = page.max(1);
        let offset = (page - 1) * PAGE_SIZE;

        let response = self
            .request(Method::GET, &self.table_url())
            .query(&[
                ("select", "*"),
                ("order", "date.desc"),
                ("offset", &offset.to_string()),
                ("limit", &PAGE_SIZE.to_string()),
            ])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let total = parse_content_range_total(
            response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
        );
        let rows: Vec<RecordingRow> = response.json().await?;
        let total_items = total.unwrap_or(rows.len() as u64);
        let total_pages = total_items.div_ceil(PAGE_SIZE as u64) as u32;

        debug!("Fetched catalog page {} ({} records)", page, rows.len());

        Ok(RecordingPage {
            items: rows.into_iter().map(Recording::from).collect(),
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_items,
                items_per_page: PAGE_SIZE,
            },
        })
    }

    async fn create(&self, recording: &Recording) -> Result<Recording, CatalogError> {
        let response = self
            .request(Method::POST, &self.table_url())
            .header("Prefer", "return=representation")
            .json(&row_payload(recording))
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let rows: Vec<RecordingRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(Recording::from)
            .ok_or_else(|| CatalogError::Decode("empty representation".to_string()))
    }

    async fn get(&self, id: i64) -> Result<Recording, CatalogError> {
        let response = self
            .request(Method::GET, &self.table_url())
            .query(&[("select", "*"), ("id", &format!("eq.{}", id))])
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let rows: Vec<RecordingRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(Recording::from)
            .ok_or(CatalogError::NotFound(id))
    }

    async fn update(&self, id: i64, patch: &RecordingPatch) -> Result<Recording, CatalogError> {
        let payload = patch_payload(patch);
        if payload.as_object().map(|m| m.is_empty()).unwrap_or(true) {
            return self.get(id).await;
        }

        let response = self
            .request(Method::PATCH, &self.table_url())
            .query(&[("id", &format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let rows: Vec<RecordingRow> = response.json().await?;
        rows.into_iter()
            .next()
            .map(Recording::from)
            .ok_or(CatalogError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        let response = self
            .request(Method::DELETE, &self.table_url())
            .query(&[("id", &format!("eq.{}", id))])
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total(Some("0-19/57")), Some(57));
        assert_eq!(parse_content_range_total(Some("*/0")), Some(0));
        assert_eq!(parse_content_range_total(Some("0-19/*")), None);
        assert_eq!(parse_content_range_total(None), None);
    }

    #[test]
    fn test_patch_payload_keeps_only_given_fields() {
        let patch = RecordingPatch {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let payload = patch_payload(&patch);
        let object = payload.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["title"], "New title");

        let empty = patch_payload(&RecordingPatch::default());
        assert!(empty.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_recording_wire_format_is_camel_case() {
        let recording = Recording {
            id: Some(7),
            title: "Morning session".to_string(),
            date: "2024-06-01".to_string(),
            media_reference: "https://example.com/media/a.mp3".to_string(),
            aux_reference: String::new(),
        };
        let value = serde_json::to_value(&recording).unwrap();
        assert_eq!(value["mediaReference"], "https://example.com/media/a.mp3");
        assert!(value.get("media_reference").is_none());

        // Row payloads go the other way: snake_case column names
        let row = row_payload(&recording);
        assert_eq!(row["media_reference"], "https://example.com/media/a.mp3");
        assert!(row.get("id").is_none());
    }
}
