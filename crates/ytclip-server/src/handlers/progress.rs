//! Live progress stream over SSE
//!
//! One subscription per connection; dropping the connection drops the
//! subscription and nothing else. A job id that already reached a
//! terminal state yields its terminal snapshot right after the
//! `connected` acknowledgment; an unknown id yields only the ack.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use uuid::Uuid;

use crate::state::AppState;

pub async fn stream(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.extractor.subscribe(job_id);

    let events = subscription.map(|event| {
        Ok::<_, Infallible>(
            Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().comment("serialization failed")),
        )
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
