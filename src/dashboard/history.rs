//! Run history for the current free-text query, last request wins.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use super::jobs::{HistoryResult, JobMessage};
use crate::api::DashboardApi;
use crate::telemetry::RunRecord;

const FETCH_RUNS_FAILED: &str = "Failed to fetch runs";

/// A fetch the store has committed to; only the newest one is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HistoryRequest {
    pub(crate) request_id: u64,
    pub(crate) query: String,
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    query: String,
    runs: Vec<RunRecord>,
    loading: bool,
    error: Option<String>,
    next_request_id: u64,
    latest_request_id: u64,
}

impl HistoryStore {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    /// True exactly while the most recent request is outstanding.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn set_query(&mut self, query: &str) -> HistoryRequest {
        self.query = query.to_string();
        self.begin_request()
    }

    /// Re-issue the current query.
    pub(crate) fn refresh(&mut self) -> HistoryRequest {
        self.begin_request()
    }

    fn begin_request(&mut self) -> HistoryRequest {
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        self.latest_request_id = self.next_request_id;
        self.loading = true;
        self.error = None;
        HistoryRequest {
            request_id: self.latest_request_id,
            query: self.query.clone(),
        }
    }

    /// Apply a result if it answers the newest request. Returns true when
    /// the run list changed.
    pub(crate) fn apply(&mut self, message: HistoryResult) -> bool {
        if message.request_id != self.latest_request_id {
            tracing::debug!(
                "Discarding stale history result {} (latest {})",
                message.request_id,
                self.latest_request_id
            );
            return false;
        }
        self.loading = false;
        match message.result {
            Ok(runs) => {
                tracing::debug!("History loaded: {} runs for {:?}", runs.len(), self.query);
                self.runs = runs;
                true
            }
            Err(err) => {
                tracing::warn!("History fetch failed: {err}");
                self.error = Some(err.user_message(FETCH_RUNS_FAILED));
                false
            }
        }
    }

    /// Forget the outstanding request; its result will be ignored.
    pub(crate) fn abandon_pending(&mut self) {
        self.latest_request_id = 0;
        self.loading = false;
    }
}

pub(crate) fn spawn_history_fetch(
    api: Arc<dyn DashboardApi>,
    request: HistoryRequest,
    tx: Sender<JobMessage>,
) {
    thread::spawn(move || {
        let result = api.fetch_runs(&request.query);
        let _ = tx.send(JobMessage::History(HistoryResult {
            request_id: request.request_id,
            result,
        }));
    });
}
