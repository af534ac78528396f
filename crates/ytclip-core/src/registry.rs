//! In-memory job store
//!
//! Jobs live here from acceptance until a bounded retention window after
//! their terminal transition. The registry is the fallback source of
//! truth for subscribers that connect after a job has finished.

use crate::events::{ProgressEvent, Stage};
use crate::timecode::ClipBounds;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

/// One extraction request and its terminal outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub source_url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipBounds>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    pub relayed: bool,
    pub persisted: bool,
}

#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<Uuid, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
        }
    }

    /// Create a job in `processing` state with a fresh time-ordered id.
    pub fn create(&self, source_url: &str, title: &str, clip: Option<ClipBounds>) -> Job {
        let job = Job {
            id: Uuid::now_v7(),
            status: JobStatus::Processing,
            source_url: source_url.to_string(),
            title: title.to_string(),
            file_name: None,
            clip,
            created_at: Utc::now(),
            completed_at: None,
            download_url: None,
            error: None,
            file_size: None,
            relayed: false,
            persisted: false,
        };
        self.jobs.insert(job.id, job.clone());
        job
    }

    /// Record the resolved title and output file name for a running job.
    pub fn set_output_identity(&self, id: Uuid, title: &str, file_name: &str) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            if job.status == JobStatus::Processing {
                job.title = title.to_string();
                job.file_name = Some(file_name.to_string());
            }
        }
    }

    /// Transition a job to `completed`. The first terminal transition
    /// wins; later calls are ignored and return false.
    pub fn mark_completed(
        &self,
        id: Uuid,
        download_url: &str,
        file_size: u64,
        relayed: bool,
        persisted: bool,
    ) -> bool {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            if job.status != JobStatus::Processing {
                return false;
            }
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.download_url = Some(download_url.to_string());
            job.file_size = Some(file_size);
            job.relayed = relayed;
            job.persisted = persisted;
            true
        } else {
            false
        }
    }

    /// Transition a job to `failed`. First terminal transition wins.
    pub fn mark_failed(&self, id: Uuid, error: &str) -> bool {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            if job.status != JobStatus::Processing {
                return false;
            }
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.error = Some(error.to_string());
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|job| job.clone())
    }

    /// All known jobs, newest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|entry| entry.clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn remove(&self, id: Uuid) -> Option<Job> {
        self.jobs.remove(&id).map(|(_, job)| job)
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Processing)
            .count()
    }

    /// Synthesize the terminal event a late subscriber missed, if the job
    /// has already reached a terminal state.
    pub fn terminal_event(&self, id: Uuid) -> Option<ProgressEvent> {
        let job = self.jobs.get(&id)?;
        match job.status {
            JobStatus::Processing => None,
            JobStatus::Completed => Some(ProgressEvent::Completed {
                job_id: job.id,
                stage: Stage::Finished,
                message: "Extraction complete".to_string(),
                progress: 100,
                file_name: job.file_name.clone().unwrap_or_default(),
                download_url: job.download_url.clone().unwrap_or_default(),
                file_size: job.file_size.unwrap_or_default(),
                relayed: job.relayed,
                persisted: job.persisted,
            }),
            JobStatus::Failed => Some(ProgressEvent::Error {
                job_id: job.id,
                stage: Stage::Failed,
                message: "Extraction failed".to_string(),
                error: job.error.clone().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_transition_is_first_wins() {
        let registry = JobRegistry::new();
        let job = registry.create("https://example.com/watch?v=1", "Test", None);

        assert!(registry.mark_completed(job.id, "https://example.com/media/clip.mp3", 42, false, false));
        assert!(!registry.mark_failed(job.id, "late failure"));

        let stored = registry.get(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert!(stored.error.is_none());
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.file_size, Some(42));
    }

    #[test]
    fn test_failed_jobs_keep_their_error() {
        let registry = JobRegistry::new();
        let job = registry.create("https://example.com/watch?v=1", "Test", None);

        assert!(registry.mark_failed(job.id, "tool exited with 1"));
        assert!(!registry.mark_completed(job.id, "url", 1, true, true));

        let stored = registry.get(job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("tool exited with 1"));
        assert!(stored.download_url.is_none());
    }

    #[test]
    fn test_list_is_newest_first() {
        let registry = JobRegistry::new();
        let first = registry.create("https://example.com/1", "a", None);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = registry.create("https://example.com/2", "b", None);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let third = registry.create("https://example.com/3", "c", None);

        let ids: Vec<Uuid> = registry.list().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(registry.active_count(), 3);
    }

    #[test]
    fn test_terminal_event_snapshot() {
        let registry = JobRegistry::new();
        let job = registry.create("https://example.com/watch?v=1", "Test", None);
        assert!(registry.terminal_event(job.id).is_none());

        registry.set_output_identity(job.id, "Test", "clip.mp3");
        registry.mark_completed(job.id, "https://example.com/media/clip.mp3", 42, true, false);

        match registry.terminal_event(job.id) {
            Some(ProgressEvent::Completed {
                progress,
                file_name,
                relayed,
                ..
            }) => {
                assert_eq!(progress, 100);
                assert_eq!(file_name, "clip.mp3");
                assert!(relayed);
            }
            other => panic!("expected completed snapshot, got {:?}", other),
        }

        registry.remove(job.id);
        assert!(registry.terminal_event(job.id).is_none());
        assert!(registry.get(job.id).is_none());
    }
}
