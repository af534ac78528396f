//! Progress event types shared by the pipeline, bus, and HTTP layer

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline stages in execution order. `Failed` is reachable from any
/// non-terminal stage and ranks last so the forward-only ordering holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Initializing,
    Downloading,
    Converting,
    Processing,
    Uploading,
    Saving,
    Finished,
    Failed,
}

impl Stage {
    pub fn rank(self) -> u8 {
        match self {
            Stage::Initializing => 0,
            Stage::Downloading => 1,
            Stage::Converting => 2,
            Stage::Processing => 3,
            Stage::Uploading => 4,
            Stage::Saving => 5,
            Stage::Finished => 6,
            Stage::Failed => 7,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Initializing => "initializing",
            Stage::Downloading => "downloading",
            Stage::Converting => "converting",
            Stage::Processing => "processing",
            Stage::Uploading => "uploading",
            Stage::Saving => "saving",
            Stage::Finished => "finished",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// One message in a job's progress stream, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    Connected {
        job_id: Uuid,
    },
    Started {
        job_id: Uuid,
        message: String,
    },
    Progress {
        job_id: Uuid,
        stage: Stage,
        message: String,
        progress: u8,
    },
    Completed {
        job_id: Uuid,
        stage: Stage,
        message: String,
        progress: u8,
        file_name: String,
        download_url: String,
        file_size: u64,
        relayed: bool,
        persisted: bool,
    },
    Error {
        job_id: Uuid,
        stage: Stage,
        message: String,
        error: String,
    },
}

impl ProgressEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            ProgressEvent::Connected { job_id }
            | ProgressEvent::Started { job_id, .. }
            | ProgressEvent::Progress { job_id, .. }
            | ProgressEvent::Completed { job_id, .. }
            | ProgressEvent::Error { job_id, .. } => *job_id,
        }
    }

    /// Terminal events close a job's stream; exactly one is published per job.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Completed { .. } | ProgressEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_forward() {
        let order = [
            Stage::Initializing,
            Stage::Downloading,
            Stage::Converting,
            Stage::Processing,
            Stage::Uploading,
            Stage::Saving,
            Stage::Finished,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        // Failed outranks everything so it is reachable from any stage
        for stage in order {
            assert!(Stage::Failed.rank() > stage.rank());
        }
    }

    #[test]
    fn test_wire_format() {
        let job_id = Uuid::now_v7();
        let event = ProgressEvent::Progress {
            job_id,
            stage: Stage::Downloading,
            message: "Downloading audio".to_string(),
            progress: 42,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["jobId"], job_id.to_string());
        assert_eq!(value["stage"], "downloading");
        assert_eq!(value["progress"], 42);
    }

    #[test]
    fn test_terminal_wire_format() {
        let job_id = Uuid::now_v7();
        let event = ProgressEvent::Completed {
            job_id,
            stage: Stage::Finished,
            message: "Extraction complete".to_string(),
            progress: 100,
            file_name: "clip.mp3".to_string(),
            download_url: "https://example.com/media/clip.mp3".to_string(),
            file_size: 1024,
            relayed: false,
            persisted: false,
        };
        assert!(event.is_terminal());

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "completed");
        assert_eq!(value["stage"], "finished");
        assert_eq!(value["fileName"], "clip.mp3");
        assert_eq!(value["downloadUrl"], "https://example.com/media/clip.mp3");
        assert_eq!(value["fileSize"], 1024);

        let connected = serde_json::to_value(ProgressEvent::Connected { job_id }).unwrap();
        assert_eq!(connected["type"], "connected");
        assert!(!ProgressEvent::Connected { job_id }.is_terminal());
    }
}
