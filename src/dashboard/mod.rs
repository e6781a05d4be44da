//! Session controller tying the live, status, history and artifact sources
//! to the derived views.
//!
//! All state is owned by [`Dashboard`] on the caller's thread. Network calls
//! run on background threads and report back as [`jobs::JobMessage`]s, which
//! [`Dashboard::poll`] applies before recomputing the views.

mod artifacts;
mod datasets;
mod history;
mod jobs;
mod live;
mod run_control;
mod status;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::sync::mpsc::TryRecvError;

pub use artifacts::{ArtifactLoader, load_artifacts};
pub use datasets::{
    DatasetOutput, LatestRun, dataset_options, dataset_outputs, latest_runs_by_dataset,
    reconcile_selection,
};
pub use history::HistoryStore;
pub use live::{LiveSubscription, parse_live_payload};
pub use run_control::{RunParams, RunRequest, RunSubmitError, build_run_form};
pub use status::StatusPoller;

use crate::aggregate::{DashboardViews, DatasetSelection, RowLimit, ScoreSort, ViewOptions};
use crate::api::DashboardApi;
use crate::config::DashboardSettings;
use crate::telemetry::{LiveSnapshot, ModelInfo, RunRecord, RunStartResponse, RunStatus};
use jobs::{DashboardJobs, JobMessage, LiveEvent, LiveEventKind};
use run_control::RunController;
use status::{StatusSequence, StatusState};

/// Latest push state.
#[derive(Default)]
struct LiveState {
    subscription: Option<LiveSubscription>,
    next_subscription_id: u64,
    snapshot: Option<LiveSnapshot>,
    /// Set when the connection ended; cleared on reconnect.
    ended: Option<LiveEnded>,
}

/// How the live connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEnded {
    /// The server finished the stream.
    Closed,
    /// Transport or protocol failure.
    Failed(String),
}

/// One dashboard session.
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    settings: DashboardSettings,
    jobs: DashboardJobs,
    active: bool,
    live: LiveState,
    status_poller: Option<StatusPoller>,
    status_sequence: StatusSequence,
    status: StatusState,
    history: HistoryStore,
    selection: DatasetSelection,
    dataset_options: Vec<DatasetSelection>,
    latest_runs: Vec<LatestRun>,
    artifacts: ArtifactLoader,
    models: Vec<ModelInfo>,
    run: RunController,
    output_csv: String,
    view_options: ViewOptions,
    views: DashboardViews,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>, settings: DashboardSettings) -> Self {
        let view_options = ViewOptions::from_settings(&settings.views);
        let output_csv = settings.run_defaults.output_csv.clone();
        Self {
            api,
            settings,
            jobs: DashboardJobs::new(),
            active: false,
            live: LiveState::default(),
            status_poller: None,
            status_sequence: StatusSequence::default(),
            status: StatusState::default(),
            history: HistoryStore::default(),
            selection: DatasetSelection::All,
            dataset_options: vec![DatasetSelection::All],
            latest_runs: Vec::new(),
            artifacts: ArtifactLoader::default(),
            models: Vec::new(),
            run: RunController::default(),
            output_csv,
            view_options,
            views: DashboardViews::default(),
        }
    }

    /// Open the live connection, start status polling, and load history and
    /// the model catalog.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        tracing::info!("Dashboard activated against {}", self.settings.base_url);
        self.open_live();
        self.status_poller = Some(StatusPoller::start(
            Arc::clone(&self.api),
            self.settings.status_poll_interval(),
            self.status_sequence.clone(),
            self.jobs.message_sender(),
        ));
        self.refresh_history();
        self.fetch_models();
        self.recompute();
    }

    /// Close the live connection and stop polling. Results still in flight
    /// are dropped.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(mut subscription) = self.live.subscription.take() {
            subscription.close();
        }
        if let Some(mut poller) = self.status_poller.take() {
            poller.stop();
        }
        self.jobs.reset();
        self.history.abandon_pending();
        self.artifacts.abandon_pending();
        self.run.reset_busy();
        tracing::info!("Dashboard deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Apply every pending background result. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        let mut views_dirty = false;
        loop {
            let message = match self.jobs.try_recv_message() {
                Ok(message) => message,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            applied += 1;
            match message {
                JobMessage::Live(event) => self.apply_live(event),
                JobMessage::Status(result) => {
                    self.status.apply(result);
                }
                JobMessage::History(result) => {
                    if self.history.apply(result) {
                        self.recompute();
                    }
                }
                JobMessage::Artifacts(batch) => {
                    views_dirty |= self.artifacts.apply(batch);
                }
                JobMessage::Models(result) => match result.result {
                    Ok(models) => self.models = models,
                    Err(err) => tracing::debug!("Model catalog unavailable: {err}"),
                },
                JobMessage::RunStarted(result) => {
                    if let Some(response) = self.run.finish(result) {
                        if !response.output_csv.is_empty() {
                            self.output_csv = response.output_csv;
                        }
                        self.refresh_status();
                    }
                }
            }
        }
        if views_dirty {
            self.refresh_views();
        }
        applied
    }

    fn apply_live(&mut self, event: LiveEvent) {
        let current = self.live.subscription.as_ref().map(LiveSubscription::id);
        if current != Some(event.subscription_id) {
            return;
        }
        match event.kind {
            LiveEventKind::Snapshot(snapshot) => {
                if let Some(snapshot) = snapshot.as_ref() {
                    if !snapshot.output_csv.is_empty() {
                        self.output_csv = snapshot.output_csv.clone();
                    }
                    if snapshot.is_terminal() {
                        tracing::debug!(
                            "Live run reached {}; refreshing history",
                            snapshot.status.map_or("unknown", |state| state.as_str())
                        );
                        self.refresh_history();
                    }
                }
                self.live.snapshot = snapshot;
            }
            LiveEventKind::Ended(error) => {
                if let Some(mut subscription) = self.live.subscription.take() {
                    subscription.close();
                }
                self.live.ended = Some(match error {
                    Some(message) => LiveEnded::Failed(message),
                    None => LiveEnded::Closed,
                });
            }
        }
    }

    fn open_live(&mut self) {
        if let Some(mut previous) = self.live.subscription.take() {
            previous.close();
        }
        self.live.next_subscription_id += 1;
        self.live.ended = None;
        self.live.subscription = Some(LiveSubscription::open(
            self.live.next_subscription_id,
            Arc::clone(&self.api),
            self.jobs.message_sender(),
        ));
    }

    /// Replace the live connection. Only meaningful while active.
    pub fn reconnect_live(&mut self) {
        if self.active {
            tracing::info!("Reconnecting live stream");
            self.open_live();
        }
    }

    /// Change the history query and fetch it.
    pub fn set_query(&mut self, query: &str) {
        let request = self.history.set_query(query);
        if self.active {
            history::spawn_history_fetch(
                Arc::clone(&self.api),
                request,
                self.jobs.message_sender(),
            );
        } else {
            self.history.abandon_pending();
        }
    }

    /// Re-fetch history for the current query.
    pub fn refresh_history(&mut self) {
        if !self.active {
            return;
        }
        let request = self.history.refresh();
        history::spawn_history_fetch(Arc::clone(&self.api), request, self.jobs.message_sender());
    }

    /// Request a status check now, independent of the poll timer.
    pub fn refresh_status(&mut self) {
        if !self.active {
            return;
        }
        status::spawn_status_refresh(
            Arc::clone(&self.api),
            self.status_sequence.clone(),
            self.jobs.message_sender(),
        );
    }

    pub fn set_dataset_filter(&mut self, selection: DatasetSelection) {
        self.selection = selection;
        self.recompute();
    }

    /// Submit a job. Validation failures are returned and also kept as the
    /// form error; server failures arrive later through [`Dashboard::poll`].
    pub fn submit_run(&mut self, request: &RunRequest) -> Result<(), RunSubmitError> {
        let form = self.run.begin(request, &self.settings.run_defaults)?;
        run_control::spawn_start_run(Arc::clone(&self.api), form, self.jobs.message_sender());
        Ok(())
    }

    pub fn cancel_run(&mut self) {
        run_control::spawn_cancel_run(Arc::clone(&self.api));
    }

    pub fn set_recent_limit(&mut self, limit: RowLimit) {
        self.view_options.recent_limit = limit;
        self.refresh_views();
    }

    pub fn set_predictions_limit(&mut self, limit: RowLimit) {
        self.view_options.predictions_limit = limit;
        self.refresh_views();
    }

    pub fn set_prediction_sort(&mut self, sort: ScoreSort) {
        self.view_options.prediction_sort = sort;
        self.refresh_views();
    }

    pub fn set_summary_limit(&mut self, limit: RowLimit) {
        self.view_options.summary_limit = limit;
        self.refresh_views();
    }

    fn fetch_models(&mut self) {
        let api = Arc::clone(&self.api);
        let tx = self.jobs.message_sender();
        std::thread::spawn(move || {
            let result = api.fetch_models();
            let _ = tx.send(JobMessage::Models(jobs::ModelsResult { result }));
        });
    }

    /// Re-derive datasets, artifact targets and views from the run list.
    fn recompute(&mut self) {
        let runs = self.history.runs();
        self.dataset_options = dataset_options(runs);
        let reconciled = reconcile_selection(&self.selection, &self.dataset_options);
        if reconciled != self.selection {
            tracing::info!(
                "Dataset filter '{}' no longer available; showing all",
                self.selection
            );
            self.selection = reconciled;
        }
        self.latest_runs = latest_runs_by_dataset(runs);
        let outputs = dataset_outputs(&self.latest_runs, &self.selection);
        if let Some(request) = self
            .artifacts
            .request(outputs, self.settings.predictions_fetch_limit)
        {
            if self.active {
                artifacts::spawn_artifact_batch(
                    Arc::clone(&self.api),
                    request,
                    self.jobs.message_sender(),
                );
            } else {
                self.artifacts.abandon_pending();
            }
        }
        self.refresh_views();
    }

    fn refresh_views(&mut self) {
        self.views = DashboardViews::compute(
            self.history.runs(),
            &self.selection,
            self.artifacts.entries(),
            &self.view_options,
        );
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn live_snapshot(&self) -> Option<&LiveSnapshot> {
        self.live.snapshot.as_ref()
    }

    pub fn live_connected(&self) -> bool {
        self.live.subscription.is_some()
    }

    pub fn live_ended(&self) -> Option<&LiveEnded> {
        self.live.ended.as_ref()
    }

    pub fn run_status(&self) -> Option<&RunStatus> {
        self.status.status()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn runs(&self) -> &[RunRecord] {
        self.history.runs()
    }

    pub fn dataset_filter(&self) -> &DatasetSelection {
        &self.selection
    }

    pub fn dataset_options(&self) -> &[DatasetSelection] {
        &self.dataset_options
    }

    pub fn latest_runs(&self) -> &[LatestRun] {
        &self.latest_runs
    }

    pub fn artifacts(&self) -> &ArtifactLoader {
        &self.artifacts
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Output path of the current or most recently started run.
    pub fn output_csv(&self) -> &str {
        &self.output_csv
    }

    pub fn form_busy(&self) -> bool {
        self.run.busy()
    }

    pub fn form_error(&self) -> Option<&RunSubmitError> {
        self.run.error()
    }

    pub fn last_started(&self) -> Option<&RunStartResponse> {
        self.run.last_started()
    }

    pub fn view_options(&self) -> &ViewOptions {
        &self.view_options
    }

    pub fn views(&self) -> &DashboardViews {
        &self.views
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.deactivate();
    }
}
