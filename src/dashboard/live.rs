//! Push subscription to the running job's progress snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use serde::Deserialize;

use super::jobs::{JobMessage, LiveEvent, LiveEventKind};
use crate::api::{DashboardApi, StreamPoll};
use crate::telemetry::LiveSnapshot;

/// Handle to the one live connection of an active session.
///
/// Closing sets a flag; the reader thread drops the connection the next time
/// it wakes, which is at most one idle tick later.
pub struct LiveSubscription {
    id: u64,
    closed: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl LiveSubscription {
    pub(crate) fn open(id: u64, api: Arc<dyn DashboardApi>, tx: Sender<JobMessage>) -> Self {
        let closed = Arc::new(AtomicBool::new(false));
        let closed_worker = Arc::clone(&closed);
        let join_handle = thread::spawn(move || read_stream(id, api.as_ref(), &closed_worker, &tx));
        Self {
            id,
            closed,
            join_handle: Some(join_handle),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn close(&mut self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            tracing::debug!("Closing live subscription {}", self.id);
        }
        // Not joined; the reader exits on its next wake-up.
        self.join_handle.take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

fn read_stream(id: u64, api: &dyn DashboardApi, closed: &AtomicBool, tx: &Sender<JobMessage>) {
    let send = |kind: LiveEventKind| {
        tx.send(JobMessage::Live(LiveEvent {
            subscription_id: id,
            kind,
        }))
        .is_ok()
    };
    let mut stream = match api.open_live_stream() {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!("Live stream unavailable: {err}");
            send(LiveEventKind::Ended(Some(err.to_string())));
            return;
        }
    };
    tracing::debug!("Live subscription {id} connected");
    loop {
        if closed.load(Ordering::Relaxed) {
            return;
        }
        match stream.poll_message() {
            Ok(StreamPoll::Message(payload)) => {
                let snapshot = parse_live_payload(&payload);
                if closed.load(Ordering::Relaxed) || !send(LiveEventKind::Snapshot(snapshot)) {
                    return;
                }
            }
            Ok(StreamPoll::Idle) => {}
            Ok(StreamPoll::Closed) => {
                tracing::info!("Live stream closed by server");
                send(LiveEventKind::Ended(None));
                return;
            }
            Err(err) => {
                tracing::warn!("Live stream failed: {err}");
                send(LiveEventKind::Ended(Some(err.to_string())));
                return;
            }
        }
    }
}

/// Decode a `{ "live": snapshot | null }` envelope. Anything unparseable
/// counts as no snapshot.
pub fn parse_live_payload(payload: &str) -> Option<LiveSnapshot> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        live: Option<LiveSnapshot>,
    }
    match serde_json::from_str::<Envelope>(payload) {
        Ok(envelope) => envelope.live,
        Err(err) => {
            tracing::debug!("Ignoring malformed live payload: {err}");
            None
        }
    }
}
