//! Predictions and group summaries for the resolved dataset outputs.

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use super::datasets::DatasetOutput;
use super::jobs::{ArtifactBatch, JobMessage};
use crate::api::{DashboardApi, build_summary_path};
use crate::telemetry::{DatasetArtifacts, GroupSummary, PredictionRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArtifactRequest {
    pub(crate) request_id: u64,
    pub(crate) outputs: Vec<DatasetOutput>,
    pub(crate) limit: Option<usize>,
}

/// Published artifacts plus the bookkeeping to discard superseded batches.
#[derive(Debug, Default)]
pub struct ArtifactLoader {
    /// `None` until the first request, so an initial empty list still clears.
    requested: Option<Vec<DatasetOutput>>,
    entries: Vec<DatasetArtifacts>,
    loading: bool,
    next_request_id: u64,
    latest_request_id: u64,
}

impl ArtifactLoader {
    pub fn entries(&self) -> &[DatasetArtifacts] {
        &self.entries
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Start a batch for `outputs` unless it matches the last request.
    ///
    /// An empty list clears the published entries immediately and returns no
    /// request.
    pub(crate) fn request(
        &mut self,
        outputs: Vec<DatasetOutput>,
        limit: Option<usize>,
    ) -> Option<ArtifactRequest> {
        if self.requested.as_ref() == Some(&outputs) {
            return None;
        }
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        self.latest_request_id = self.next_request_id;
        self.requested = Some(outputs.clone());
        if outputs.is_empty() {
            self.entries.clear();
            self.loading = false;
            return None;
        }
        self.loading = true;
        Some(ArtifactRequest {
            request_id: self.latest_request_id,
            outputs,
            limit,
        })
    }

    /// Publish a finished batch if it is still the newest.
    pub(crate) fn apply(&mut self, batch: ArtifactBatch) -> bool {
        if batch.request_id != self.latest_request_id {
            tracing::debug!("Discarding superseded artifact batch {}", batch.request_id);
            return false;
        }
        self.loading = false;
        self.entries = batch.entries;
        true
    }

    /// Drop an in-flight batch so the same outputs are requested again later.
    pub(crate) fn abandon_pending(&mut self) {
        if self.loading {
            self.requested = None;
            self.loading = false;
            self.latest_request_id = 0;
        }
    }
}

pub(crate) fn spawn_artifact_batch(
    api: Arc<dyn DashboardApi>,
    request: ArtifactRequest,
    tx: Sender<JobMessage>,
) {
    thread::spawn(move || {
        let entries = load_artifacts(api.as_ref(), &request.outputs, request.limit);
        let _ = tx.send(JobMessage::Artifacts(ArtifactBatch {
            request_id: request.request_id,
            entries,
        }));
    });
}

/// Fetch predictions and summary for every output in parallel. Each fetch
/// degrades on its own: failed predictions are empty, a failed summary is `None`.
pub fn load_artifacts(
    api: &dyn DashboardApi,
    outputs: &[DatasetOutput],
    limit: Option<usize>,
) -> Vec<DatasetArtifacts> {
    thread::scope(|scope| {
        let handles: Vec<_> = outputs
            .iter()
            .map(|output| {
                let predictions = scope.spawn(move || load_predictions(api, output, limit));
                let summary = scope.spawn(move || load_summary(api, output));
                (output, predictions, summary)
            })
            .collect();
        handles
            .into_iter()
            .map(|(output, predictions, summary)| DatasetArtifacts {
                dataset: output.dataset.clone(),
                output_csv: output.output_csv.clone(),
                predictions: predictions.join().unwrap_or_default(),
                summary: summary.join().unwrap_or_default(),
            })
            .collect()
    })
}

fn load_predictions(
    api: &dyn DashboardApi,
    output: &DatasetOutput,
    limit: Option<usize>,
) -> Vec<PredictionRow> {
    match api.fetch_predictions(&output.output_csv, limit) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(
                "Predictions for {} ({}) unavailable: {err}",
                output.dataset,
                output.output_csv
            );
            Vec::new()
        }
    }
}

fn load_summary(api: &dyn DashboardApi, output: &DatasetOutput) -> Option<GroupSummary> {
    let path = build_summary_path(&output.output_csv);
    match api.fetch_summary(&path) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!("Summary for {} ({path}) unavailable: {err}", output.dataset);
            None
        }
    }
}
