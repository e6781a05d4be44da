use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use crate::api::ApiError;
use crate::telemetry::{
    DatasetArtifacts, LiveSnapshot, ModelInfo, RunRecord, RunStartResponse, RunStatus,
};

/// Results delivered from background threads to the owning [`super::Dashboard`].
#[derive(Debug)]
pub(crate) enum JobMessage {
    Live(LiveEvent),
    Status(StatusResult),
    History(HistoryResult),
    Artifacts(ArtifactBatch),
    Models(ModelsResult),
    RunStarted(RunStartResult),
}

#[derive(Debug)]
pub(crate) struct LiveEvent {
    pub(crate) subscription_id: u64,
    pub(crate) kind: LiveEventKind,
}

#[derive(Debug)]
pub(crate) enum LiveEventKind {
    /// A decoded envelope; `None` when the job published nothing or the
    /// payload did not parse.
    Snapshot(Option<LiveSnapshot>),
    /// The connection is gone, with the transport error if there was one.
    Ended(Option<String>),
}

#[derive(Debug)]
pub(crate) struct StatusResult {
    pub(crate) sequence: u64,
    pub(crate) result: Result<RunStatus, ApiError>,
}

#[derive(Debug)]
pub(crate) struct HistoryResult {
    pub(crate) request_id: u64,
    pub(crate) result: Result<Vec<RunRecord>, ApiError>,
}

#[derive(Debug)]
pub(crate) struct ArtifactBatch {
    pub(crate) request_id: u64,
    pub(crate) entries: Vec<DatasetArtifacts>,
}

#[derive(Debug)]
pub(crate) struct ModelsResult {
    pub(crate) result: Result<Vec<ModelInfo>, ApiError>,
}

#[derive(Debug)]
pub(crate) struct RunStartResult {
    pub(crate) result: Result<RunStartResponse, ApiError>,
}

/// The channel background work reports through.
pub(crate) struct DashboardJobs {
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
}

impl DashboardJobs {
    pub(crate) fn new() -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel::<JobMessage>();
        Self {
            message_tx,
            message_rx,
        }
    }

    pub(crate) fn message_sender(&self) -> Sender<JobMessage> {
        self.message_tx.clone()
    }

    pub(crate) fn try_recv_message(&self) -> Result<JobMessage, TryRecvError> {
        self.message_rx.try_recv()
    }

    /// Swap in a fresh channel. Threads still holding the old sender fail
    /// their next send and their results are dropped.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}
