//! Artifact relay to remote object storage

use crate::config::RelayConfig;
use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Destination for produced artifacts. Relaying is best-effort: the
/// pipeline falls back to the local reference when a store call fails.
#[async_trait]
pub trait ArtifactRelay: Send + Sync {
    /// Upload a local file under the given object name and return its
    /// public reference.
    async fn store(&self, local: &Path, object_name: &str) -> Result<String, RelayError>;
}

/// Supabase-style object storage over HTTP.
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
    key: String,
    bucket: String,
}

impl HttpRelay {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, name)
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, self.bucket, name)
    }
}

#[async_trait]
impl ArtifactRelay for HttpRelay {
    async fn store(&self, local: &Path, object_name: &str) -> Result<String, RelayError> {
        let file = tokio::fs::File::open(local).await?;
        let size = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        info!(
            "Relaying {} ({} bytes) to bucket {}",
            object_name, size, self.bucket
        );

        let response = self
            .client
            .post(self.object_url(object_name))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header(CONTENT_TYPE, "audio/mpeg")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected { status, body });
        }

        debug!("Relayed {} to remote storage", object_name);
        Ok(self.public_url(object_name))
    }
}
