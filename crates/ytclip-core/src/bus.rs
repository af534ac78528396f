//! Per-job multicast distribution of progress events
//!
//! Subscribers register an output channel against a job id; publishing
//! fans an event out to every live handle for that id. Delivery is
//! best-effort: a handle whose receiver is gone is pruned and the rest
//! still receive the event. Nothing is buffered for future subscribers.

use crate::events::{ProgressEvent, Stage};
use dashmap::DashMap;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use uuid::Uuid;

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

struct BusInner {
    channels: DashMap<Uuid, Vec<Subscriber>>,
    next_handle: AtomicU64,
}

#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<BusInner>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: DashMap::new(),
                next_handle: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber for a job id. The id does not need to
    /// belong to a known job. The subscription immediately carries a
    /// synthetic `connected` acknowledgment.
    pub fn subscribe(&self, job_id: Uuid) -> Subscription {
        self.subscribe_with_snapshot(job_id, None)
    }

    /// Like [`subscribe`](Self::subscribe), but also seeds the new
    /// subscription with a terminal snapshot event. The snapshot goes only
    /// to the new handle, never to existing subscribers.
    pub fn subscribe_with_snapshot(
        &self,
        job_id: Uuid,
        snapshot: Option<ProgressEvent>,
    ) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ProgressEvent::Connected { job_id });
        if let Some(event) = snapshot {
            let _ = tx.send(event);
        }

        let id = self.inner.next_handle.fetch_add(1, Ordering::Relaxed);
        self.inner
            .channels
            .entry(job_id)
            .or_default()
            .push(Subscriber { id, tx });

        Subscription {
            bus: self.clone(),
            job_id,
            id,
            rx,
        }
    }

    /// Remove one handle. Dropping the last handle for a job drops the
    /// whole entry.
    pub fn unsubscribe(&self, job_id: Uuid, handle_id: u64) {
        let mut empty = false;
        if let Some(mut subscribers) = self.inner.channels.get_mut(&job_id) {
            subscribers.retain(|s| s.id != handle_id);
            empty = subscribers.is_empty();
        }
        if empty {
            self.inner.channels.remove_if(&job_id, |_, v| v.is_empty());
        }
    }

    /// Deliver an event to every live handle for a job. Handles whose
    /// receiver is gone are pruned as a side effect.
    pub fn publish(&self, job_id: Uuid, event: ProgressEvent) {
        if let Some(mut subscribers) = self.inner.channels.get_mut(&job_id) {
            subscribers.retain(|s| s.tx.send(event.clone()).is_ok());
        }
    }

    /// Drop all handles for a job (used by eviction).
    pub fn remove_job(&self, job_id: Uuid) {
        self.inner.channels.remove(&job_id);
    }

    pub fn subscriber_count(&self, job_id: Uuid) -> usize {
        self.inner
            .channels
            .get(&job_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// A live subscription to one job's progress stream. Unsubscribes itself
/// when dropped; the connection owning it controls its lifetime.
pub struct Subscription {
    bus: ProgressBus,
    job_id: Uuid,
    id: u64,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

impl Subscription {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }
}

impl Stream for Subscription {
    type Item = ProgressEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.job_id, self.id);
    }
}

/// Publishing side of one job's stream. Enforces the per-job ordering
/// contract: progress percentages never decrease (regressions are clamped
/// to the running maximum) and stages never move backward.
pub struct JobPublisher {
    bus: ProgressBus,
    job_id: Uuid,
    stage: Stage,
    max_progress: u8,
}

impl JobPublisher {
    pub fn new(bus: ProgressBus, job_id: Uuid) -> Self {
        Self {
            bus,
            job_id,
            stage: Stage::Initializing,
            max_progress: 0,
        }
    }

    pub fn started(&mut self, message: impl Into<String>) {
        self.bus.publish(
            self.job_id,
            ProgressEvent::Started {
                job_id: self.job_id,
                message: message.into(),
            },
        );
    }

    pub fn progress(&mut self, stage: Stage, message: impl Into<String>, percent: u8) {
        let stage = if stage.rank() < self.stage.rank() {
            self.stage
        } else {
            stage
        };
        self.stage = stage;

        let percent = percent.min(100).max(self.max_progress);
        self.max_progress = percent;

        self.bus.publish(
            self.job_id,
            ProgressEvent::Progress {
                job_id: self.job_id,
                stage,
                message: message.into(),
                progress: percent,
            },
        );
    }

    pub fn completed(
        &mut self,
        message: impl Into<String>,
        file_name: &str,
        download_url: &str,
        file_size: u64,
        relayed: bool,
        persisted: bool,
    ) {
        self.stage = Stage::Finished;
        self.max_progress = 100;
        self.bus.publish(
            self.job_id,
            ProgressEvent::Completed {
                job_id: self.job_id,
                stage: Stage::Finished,
                message: message.into(),
                progress: 100,
                file_name: file_name.to_string(),
                download_url: download_url.to_string(),
                file_size,
                relayed,
                persisted,
            },
        );
    }

    pub fn error(&mut self, message: impl Into<String>, detail: impl Into<String>) {
        self.stage = Stage::Failed;
        self.bus.publish(
            self.job_id,
            ProgressEvent::Error {
                job_id: self.job_id,
                stage: Stage::Failed,
                message: message.into(),
                error: detail.into(),
            },
        );
    }
}
