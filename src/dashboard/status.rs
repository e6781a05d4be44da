//! Periodic and on-demand job-process status checks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use super::jobs::{JobMessage, StatusResult};
use crate::api::DashboardApi;
use crate::telemetry::RunStatus;

/// Sequence numbers shared by the timer and on-demand refreshes.
#[derive(Clone, Default)]
pub(crate) struct StatusSequence(Arc<AtomicU64>);

impl StatusSequence {
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Timer thread issuing a status request immediately and then every interval.
pub struct StatusPoller {
    stop_tx: Option<Sender<()>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl StatusPoller {
    pub(crate) fn start(
        api: Arc<dyn DashboardApi>,
        interval: Duration,
        sequence: StatusSequence,
        tx: Sender<JobMessage>,
    ) -> Self {
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let join_handle = thread::spawn(move || {
            loop {
                if !fetch_status(api.as_ref(), &sequence, &tx) {
                    break;
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("Status poller stopped");
        });
        Self {
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.join_handle.take();
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One-off status request outside the timer.
pub(crate) fn spawn_status_refresh(
    api: Arc<dyn DashboardApi>,
    sequence: StatusSequence,
    tx: Sender<JobMessage>,
) {
    thread::spawn(move || {
        fetch_status(api.as_ref(), &sequence, &tx);
    });
}

/// Returns false once the receiving side is gone.
fn fetch_status(api: &dyn DashboardApi, sequence: &StatusSequence, tx: &Sender<JobMessage>) -> bool {
    let sequence = sequence.next();
    let result = api.fetch_run_status();
    tx.send(JobMessage::Status(StatusResult { sequence, result }))
        .is_ok()
}

/// Latest applied status.
#[derive(Debug, Default)]
pub(crate) struct StatusState {
    status: Option<RunStatus>,
    last_applied: u64,
}

impl StatusState {
    pub(crate) fn status(&self) -> Option<&RunStatus> {
        self.status.as_ref()
    }

    /// Apply a result unless a newer one was already applied. A failure
    /// clears the status.
    pub(crate) fn apply(&mut self, message: StatusResult) -> bool {
        if message.sequence <= self.last_applied {
            return false;
        }
        self.last_applied = message.sequence;
        self.status = match message.result {
            Ok(status) => Some(status),
            Err(err) => {
                tracing::debug!("Run status check failed: {err}");
                None
            }
        };
        true
    }
}
