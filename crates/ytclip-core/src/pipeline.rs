//! Extraction pipeline orchestration
//!
//! The [`Extractor`] coordinates one extraction job through its stages:
//! title resolution, acquisition, verification, optional relay to remote
//! storage, optional catalog write, completion. Accepting a request only
//! validates it and probes the tool; the pipeline itself runs as a
//! spawned task and reports exclusively through the progress bus.

use crate::bus::{JobPublisher, ProgressBus, Subscription};
use crate::catalog::{CatalogStore, HttpCatalog, Recording};
use crate::config::Config;
use crate::error::{RunnerError, ValidationError, YtClipError};
use crate::events::Stage;
use crate::registry::JobRegistry;
use crate::relay::{ArtifactRelay, HttpRelay};
use crate::runner::{RunnerProgress, ToolRunner};
use crate::timecode::ClipBounds;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fallback title when auto-resolution fails or yields nothing usable.
const TITLE_PLACEHOLDER: &str = "untitled";

/// Longest sanitized title carried into an output file name.
const TITLE_MAX_LEN: usize = 50;

/// One inbound extraction request, as accepted by [`Extractor::start`].
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    pub url: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub title: Option<String>,
    /// Host used when building the public download link; falls back to
    /// the configured public host, then to `localhost`.
    pub host: Option<String>,
}

/// Acknowledgment returned to the caller before the pipeline does any
/// substantive work.
#[derive(Debug, Clone, Copy)]
pub struct Accepted {
    pub job_id: Uuid,
}

pub struct ExtractorBuilder {
    yt_dlp: PathBuf,
    media_dir: PathBuf,
    retention: Duration,
    public_host: Option<String>,
    relay: Option<Arc<dyn ArtifactRelay>>,
    catalog: Option<Arc<dyn CatalogStore>>,
}

impl ExtractorBuilder {
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    pub fn relay(mut self, relay: Arc<dyn ArtifactRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> Extractor {
        Extractor {
            inner: Arc::new(Inner {
                runner: ToolRunner::new(self.yt_dlp),
                registry: JobRegistry::new(),
                bus: ProgressBus::new(),
                relay: self.relay,
                catalog: self.catalog,
                media_dir: self.media_dir,
                retention: self.retention,
                public_host: self.public_host,
                tracker: TaskTracker::new(),
            }),
        }
    }
}

struct Inner {
    runner: ToolRunner,
    registry: JobRegistry,
    bus: ProgressBus,
    relay: Option<Arc<dyn ArtifactRelay>>,
    catalog: Option<Arc<dyn CatalogStore>>,
    media_dir: PathBuf,
    retention: Duration,
    public_host: Option<String>,
    tracker: TaskTracker,
}

/// Process-wide pipeline coordinator. Owns the job registry, the progress
/// bus, and the task tracker holding in-flight pipelines.
#[derive(Clone)]
pub struct Extractor {
    inner: Arc<Inner>,
}

impl Extractor {
    pub fn builder(yt_dlp: impl Into<PathBuf>, media_dir: impl Into<PathBuf>) -> ExtractorBuilder {
        ExtractorBuilder {
            yt_dlp: yt_dlp.into(),
            media_dir: media_dir.into(),
            retention: Duration::from_secs(300),
            public_host: None,
            relay: None,
            catalog: None,
        }
    }

    /// Wire up an extractor from loaded configuration. Absent `[relay]`
    /// and `[catalog]` tables leave those stages disabled.
    pub fn from_config(config: &Config) -> Result<Self, YtClipError> {
        let mut builder = Self::builder(config.yt_dlp_path()?, config.media.dir.clone())
            .retention(config.retention());

        if let Some(host) = &config.server.public_host {
            builder = builder.public_host(host.clone());
        }
        if let Some(relay) = &config.relay {
            builder = builder.relay(Arc::new(HttpRelay::new(relay)));
        }
        if let Some(catalog) = &config.catalog {
            builder = builder.catalog(Arc::new(HttpCatalog::new(catalog)));
        }

        Ok(builder.build())
    }

    /// Validate a request, probe the tool, and hand the pipeline off to a
    /// spawned task. Returns as soon as the job is accepted; everything
    /// after acceptance is reported through the progress stream.
    pub async fn start(&self, request: ExtractionRequest) -> Result<Accepted, YtClipError> {
        let source_url = request.url.trim().to_string();
        if source_url.is_empty() {
            return Err(ValidationError::MissingSource.into());
        }
        let clip =
            ClipBounds::from_options(request.start_time.as_deref(), request.end_time.as_deref())?;

        // Tool availability is checked before any filesystem side effects
        self.inner.runner.probe().await?;
        tokio::fs::create_dir_all(&self.inner.media_dir).await?;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let job = self
            .inner
            .registry
            .create(&source_url, title.as_deref().unwrap_or(""), clip);
        let job_id = job.id;

        info!("Accepted extraction job {} for {}", job_id, source_url);

        let inner = Arc::clone(&self.inner);
        let host = request.host;
        self.inner.tracker.spawn(async move {
            run_job(inner, job_id, source_url, title, clip, host).await;
        });

        Ok(Accepted { job_id })
    }

    /// Open a live subscription to a job's progress stream. If the job has
    /// already reached a terminal state the subscription is seeded with a
    /// terminal snapshot; otherwise a late id yields only the `connected`
    /// acknowledgment.
    pub fn subscribe(&self, job_id: Uuid) -> Subscription {
        let snapshot = self.inner.registry.terminal_event(job_id);
        self.inner.bus.subscribe_with_snapshot(job_id, snapshot)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Tool availability probe, also surfaced by the status endpoint.
    pub async fn probe(&self) -> Result<String, RunnerError> {
        self.inner.runner.probe().await
    }

    pub fn media_dir(&self) -> &Path {
        &self.inner.media_dir
    }

    pub fn relay_configured(&self) -> bool {
        self.inner.relay.is_some()
    }

    pub fn catalog(&self) -> Option<Arc<dyn CatalogStore>> {
        self.inner.catalog.clone()
    }

    /// Stop accepting pipeline tasks and wait for in-flight jobs to run to
    /// completion. Jobs are never cancelled mid-flight.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

async fn run_job(
    inner: Arc<Inner>,
    job_id: Uuid,
    source_url: String,
    title: Option<String>,
    clip: Option<ClipBounds>,
    host: Option<String>,
) {
    let mut publisher = JobPublisher::new(inner.bus.clone(), job_id);
    publisher.started("Starting extraction");
    publisher.progress(Stage::Initializing, "Preparing extraction", 0);

    let title = match title {
        Some(title) => title,
        None => {
            publisher.progress(Stage::Initializing, "Resolving title", 5);
            inner
                .runner
                .resolve_title(&source_url)
                .await
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string())
        }
    };

    let file_name = format!("{}_{}.mp3", job_id, sanitize_title(&title));
    inner.registry.set_output_identity(job_id, &title, &file_name);
    let output_path = inner.media_dir.join(&file_name);

    publisher.progress(Stage::Downloading, "Downloading audio", 10);

    let outcome = {
        let (tx, mut rx) = mpsc::channel(32);
        let run = inner.runner.run(&source_url, &output_path, clip.as_ref(), tx);
        tokio::pin!(run);

        let outcome = loop {
            tokio::select! {
                result = &mut run => break result,
                Some(update) = rx.recv() => forward_progress(&mut publisher, update),
            }
        };
        // Updates still queued when the process exited
        while let Ok(update) = rx.try_recv() {
            forward_progress(&mut publisher, update);
        }
        outcome
    };

    let file_size = match outcome {
        Ok(size) => size,
        Err(err) => {
            warn!("Job {} failed: {}", job_id, err);
            inner.registry.mark_failed(job_id, &err.to_string());
            publisher.error("Extraction failed", err.to_string());
            schedule_eviction(inner, job_id);
            return;
        }
    };

    publisher.progress(Stage::Processing, "Verifying output", 90);

    let mut relayed = false;
    let mut download_url = public_url(host.as_deref(), inner.public_host.as_deref(), &file_name);
    if let Some(relay) = &inner.relay {
        publisher.progress(Stage::Uploading, "Relaying to storage", 95);
        match relay.store(&output_path, &file_name).await {
            Ok(url) => {
                relayed = true;
                download_url = url;
            }
            Err(err) => {
                warn!(
                    "Relay failed for job {}, keeping local reference: {}",
                    job_id, err
                );
            }
        }
    }

    let mut persisted = false;
    if let Some(catalog) = &inner.catalog {
        publisher.progress(Stage::Saving, "Recording metadata", 98);
        let record = Recording {
            id: None,
            title: title.clone(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
            media_reference: download_url.clone(),
            aux_reference: String::new(),
        };
        match catalog.create(&record).await {
            Ok(_) => persisted = true,
            Err(err) => warn!("Catalog write failed for job {}: {}", job_id, err),
        }
    }

    info!("Job {} complete: {} ({} bytes)", job_id, file_name, file_size);
    inner
        .registry
        .mark_completed(job_id, &download_url, file_size, relayed, persisted);
    publisher.completed(
        "Extraction complete",
        &file_name,
        &download_url,
        file_size,
        relayed,
        persisted,
    );
    schedule_eviction(inner, job_id);
}

fn forward_progress(publisher: &mut JobPublisher, update: RunnerProgress) {
    match update {
        RunnerProgress::Download { raw, overall } => publisher.progress(
            Stage::Downloading,
            format!("Downloading audio {:.1}%", raw),
            overall,
        ),
        RunnerProgress::Converting => {
            publisher.progress(Stage::Converting, "Converting to MP3", 85)
        }
    }
}

/// Evict the job record and its bus entry once the retention window has
/// elapsed. Detached on purpose: shutdown does not wait out retention.
fn schedule_eviction(inner: Arc<Inner>, job_id: Uuid) {
    tokio::spawn(async move {
        tokio::time::sleep(inner.retention).await;
        inner.registry.remove(job_id);
        inner.bus.remove_job(job_id);
        debug!("Evicted job {}", job_id);
    });
}

/// Download links always render the secure scheme, whatever the inbound
/// request used.
fn public_url(request_host: Option<&str>, public_host: Option<&str>, file_name: &str) -> String {
    let host = public_host
        .or(request_host)
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    format!("https://{}/media/{}", host, file_name)
}

/// Make a title safe for use in a file name: whitespace runs collapse to
/// a single underscore, reserved and control characters are replaced, and
/// the result is truncated.
pub fn sanitize_title(title: &str) -> String {
    let joined = title.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(TITLE_MAX_LEN)
        .collect();

    if cleaned.is_empty() {
        TITLE_PLACEHOLDER.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Morning Session"), "Morning_Session");
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_title("  spaced   out  "), "spaced_out");
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("///"), "___");

        let long = "x".repeat(80);
        assert_eq!(sanitize_title(&long).len(), 50);
    }

    #[test]
    fn test_public_url_prefers_configured_host() {
        assert_eq!(
            public_url(Some("req.example.com"), Some("cdn.example.com"), "a.mp3"),
            "https://cdn.example.com/media/a.mp3"
        );
        assert_eq!(
            public_url(Some("req.example.com:9899"), None, "a.mp3"),
            "https://req.example.com:9899/media/a.mp3"
        );
        assert_eq!(public_url(None, None, "a.mp3"), "https://localhost/media/a.mp3");
        assert_eq!(public_url(Some(""), None, "a.mp3"), "https://localhost/media/a.mp3");
    }
}
