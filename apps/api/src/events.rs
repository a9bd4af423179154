//! Change feed for jobs.
//!
//! Writers publish through the `JobObserver` seam; `JobEvents` fans events
//! out to every connected `/api/v1/events` client over a broadcast channel.
//! Publishing never fails the caller: with no subscribers the event is dropped.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{self, Stream};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::job::JobDetail;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum JobEvent {
    Created(JobDetail),
    Updated(JobDetail),
    Deleted(Uuid),
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::Created(_) => "job:created",
            JobEvent::Updated(_) => "job:updated",
            JobEvent::Deleted(_) => "job:deleted",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            JobEvent::Created(detail) | JobEvent::Updated(detail) => {
                serde_json::to_value(detail).unwrap_or(serde_json::Value::Null)
            }
            JobEvent::Deleted(id) => json!({ "jobId": id }),
        }
    }

    fn to_sse(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

/// Receives job change notifications.
pub trait JobObserver: Send + Sync {
    fn notify(&self, event: JobEvent);
}

/// Broadcast hub behind the SSE endpoint.
#[derive(Clone)]
pub struct JobEvents {
    tx: broadcast::Sender<JobEvent>,
}

impl JobEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for JobEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl JobObserver for JobEvents {
    fn notify(&self, event: JobEvent) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => debug!("Published {name} to {receivers} subscriber(s)"),
            Err(_) => debug!("Dropped {name}: no subscribers"),
        }
    }
}

/// GET /api/v1/events
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Ok(event.to_sse()), rx)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE subscriber lagged, skipped {skipped} event(s)");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
