use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::Dashboard;
use crate::api::{ApiError, DashboardApi, LiveStream, RunForm, StreamPoll};
use crate::config::DashboardSettings;
use crate::telemetry::{
    GroupSummary, ModelInfo, PredictionRow, RunRecord, RunStartResponse, RunStatus,
};

const STREAM_TICK: Duration = Duration::from_millis(20);

/// In-memory [`DashboardApi`] with scripted responses and a call log.
pub(crate) struct FakeApi {
    runs: Mutex<HashMap<String, Result<Vec<RunRecord>, ApiError>>>,
    history_gates: Mutex<HashMap<String, Receiver<()>>>,
    status: Mutex<Result<RunStatus, ApiError>>,
    predictions: Mutex<HashMap<String, Result<Vec<PredictionRow>, ApiError>>>,
    summaries: Mutex<HashMap<String, Result<Option<GroupSummary>, ApiError>>>,
    models: Mutex<Result<Vec<ModelInfo>, ApiError>>,
    start_result: Mutex<Result<RunStartResponse, ApiError>>,
    cancel_result: Mutex<Result<(), ApiError>>,
    streams: Mutex<VecDeque<Receiver<StreamPoll>>>,
    submitted: Mutex<Vec<RunForm>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(HashMap::new()),
            history_gates: Mutex::new(HashMap::new()),
            status: Mutex::new(Ok(RunStatus::default())),
            predictions: Mutex::new(HashMap::new()),
            summaries: Mutex::new(HashMap::new()),
            models: Mutex::new(Ok(Vec::new())),
            start_result: Mutex::new(Err(ApiError::Transport("not scripted".to_string()))),
            cancel_result: Mutex::new(Ok(())),
            streams: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_runs(&self, query: &str, runs: Vec<RunRecord>) {
        self.set_runs_result(query, Ok(runs));
    }

    pub(crate) fn set_runs_result(&self, query: &str, result: Result<Vec<RunRecord>, ApiError>) {
        self.runs.lock().unwrap().insert(query.to_string(), result);
    }

    /// Hold the next fetch for `query` until the returned sender fires or drops.
    pub(crate) fn gate_history(&self, query: &str) -> Sender<()> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.history_gates
            .lock()
            .unwrap()
            .insert(query.to_string(), rx);
        tx
    }

    pub(crate) fn set_status(&self, status: Result<RunStatus, ApiError>) {
        *self.status.lock().unwrap() = status;
    }

    pub(crate) fn set_predictions(&self, path: &str, rows: Result<Vec<PredictionRow>, ApiError>) {
        self.predictions
            .lock()
            .unwrap()
            .insert(path.to_string(), rows);
    }

    pub(crate) fn set_summary(&self, path: &str, summary: Result<Option<GroupSummary>, ApiError>) {
        self.summaries
            .lock()
            .unwrap()
            .insert(path.to_string(), summary);
    }

    pub(crate) fn set_models(&self, models: Vec<ModelInfo>) {
        *self.models.lock().unwrap() = Ok(models);
    }

    pub(crate) fn set_start_result(&self, result: Result<RunStartResponse, ApiError>) {
        *self.start_result.lock().unwrap() = result;
    }

    pub(crate) fn set_cancel_result(&self, result: Result<(), ApiError>) {
        *self.cancel_result.lock().unwrap() = result;
    }

    /// Queue a live connection; payloads sent on the returned channel are
    /// delivered as stream messages, dropping it closes the stream.
    pub(crate) fn push_stream(&self) -> Sender<StreamPoll> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.streams.lock().unwrap().push_back(rx);
        tx
    }

    pub(crate) fn submitted(&self) -> Vec<RunForm> {
        self.submitted.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DashboardApi for FakeApi {
    fn fetch_runs(&self, query: &str) -> Result<Vec<RunRecord>, ApiError> {
        self.record(format!("runs:{query}"));
        let gate = self.history_gates.lock().unwrap().remove(query);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let result = self
            .runs
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        self.record(format!("runs-done:{query}"));
        result
    }

    fn fetch_run_status(&self) -> Result<RunStatus, ApiError> {
        self.record("status".to_string());
        self.status.lock().unwrap().clone()
    }

    fn open_live_stream(&self) -> Result<Box<dyn LiveStream>, ApiError> {
        self.record("live".to_string());
        match self.streams.lock().unwrap().pop_front() {
            Some(rx) => Ok(Box::new(ScriptedStream { rx })),
            None => Err(ApiError::Transport("connection refused".to_string())),
        }
    }

    fn fetch_predictions(
        &self,
        path: &str,
        _limit: Option<usize>,
    ) -> Result<Vec<PredictionRow>, ApiError> {
        self.record(format!("predictions:{path}"));
        self.predictions
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn fetch_summary(&self, path: &str) -> Result<Option<GroupSummary>, ApiError> {
        self.record(format!("summary:{path}"));
        self.summaries
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Ok(None))
    }

    fn fetch_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        self.record("models".to_string());
        self.models.lock().unwrap().clone()
    }

    fn start_run(&self, form: &RunForm) -> Result<RunStartResponse, ApiError> {
        self.record("start".to_string());
        self.submitted.lock().unwrap().push(form.clone());
        self.start_result.lock().unwrap().clone()
    }

    fn cancel_run(&self) -> Result<(), ApiError> {
        self.record("cancel".to_string());
        self.cancel_result.lock().unwrap().clone()
    }
}

struct ScriptedStream {
    rx: Receiver<StreamPoll>,
}

impl LiveStream for ScriptedStream {
    fn poll_message(&mut self) -> Result<StreamPoll, ApiError> {
        match self.rx.recv_timeout(STREAM_TICK) {
            Ok(poll) => Ok(poll),
            Err(RecvTimeoutError::Timeout) => Ok(StreamPoll::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(StreamPoll::Closed),
        }
    }
}

/// Settings with a poll interval long enough that only the initial status
/// check fires during a test.
pub(crate) fn test_settings() -> DashboardSettings {
    DashboardSettings {
        status_poll_interval_ms: 60_000,
        ..DashboardSettings::default()
    }
}

pub(crate) fn dashboard(api: &Arc<FakeApi>) -> Dashboard {
    dashboard_with(api, test_settings())
}

pub(crate) fn dashboard_with(api: &Arc<FakeApi>, settings: DashboardSettings) -> Dashboard {
    let api: Arc<dyn DashboardApi> = api.clone();
    Dashboard::new(api, settings)
}

/// Poll until `done` holds or a few seconds pass.
pub(crate) fn poll_until(dashboard: &mut Dashboard, done: impl Fn(&Dashboard) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        dashboard.poll();
        if done(dashboard) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Wait until `api` has logged `count` calls starting with `prefix`.
pub(crate) fn wait_for_calls(api: &FakeApi, prefix: &str, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if api.calls(prefix) >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

pub(crate) fn live_payload(json: &str) -> StreamPoll {
    StreamPoll::Message(json.to_string())
}
