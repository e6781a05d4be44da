//! Job submission and cancellation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use super::jobs::{JobMessage, RunStartResult};
use crate::api::{DashboardApi, RunForm};
use crate::config::{CsvMode, RunDefaults};
use crate::telemetry::RunStartResponse;

pub(crate) const START_RUN_FAILED: &str = "Failed to start run";

/// Why a submission did not start a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunSubmitError {
    #[error("Please select a CSV file.")]
    MissingFile,
    #[error("A run submission is already in progress.")]
    Busy,
    /// Server-provided message, or a generic fallback.
    #[error("{0}")]
    Server(String),
}

/// Parameters of the run form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub csv_mode: CsvMode,
    pub output_csv: String,
    pub text_col: String,
    /// Column position used in headerless mode.
    pub text_col_index: Option<u32>,
    pub group_col_index: Option<u32>,
    pub model_name: String,
    pub batch_size: u32,
    pub max_len: u32,
    pub max_rows: Option<u64>,
    pub metrics_port: Option<u16>,
}

impl RunParams {
    pub fn from_defaults(defaults: &RunDefaults) -> Self {
        Self {
            csv_mode: defaults.csv_mode,
            output_csv: defaults.output_csv.clone(),
            text_col: defaults.text_col.clone(),
            text_col_index: None,
            group_col_index: None,
            model_name: defaults.model_name.clone(),
            batch_size: defaults.batch_size,
            max_len: defaults.max_len,
            max_rows: None,
            metrics_port: None,
        }
    }
}

/// A submission: the CSV to upload and the form parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub file: Option<PathBuf>,
    pub params: RunParams,
}

impl RunRequest {
    pub fn new(file: impl Into<PathBuf>, params: RunParams) -> Self {
        Self {
            file: Some(file.into()),
            params,
        }
    }
}

/// Build the multipart form, sending only meaningful fields.
pub fn build_run_form(
    request: &RunRequest,
    defaults: &RunDefaults,
) -> Result<RunForm, RunSubmitError> {
    let file = request.file.as_ref().ok_or(RunSubmitError::MissingFile)?;
    let params = &request.params;
    let mut form = RunForm::new(file.clone());
    let output_csv = params.output_csv.trim();
    if !output_csv.is_empty() && output_csv != defaults.output_csv {
        form.push("output_csv", output_csv);
    }
    form.push("csv_mode", params.csv_mode.as_str());
    if params.csv_mode == CsvMode::Headerless {
        if let Some(index) = params.text_col_index {
            form.push("text_col_index", index.to_string());
        }
    } else {
        let text_col = params.text_col.trim();
        if !text_col.is_empty() {
            form.push("text_col", text_col);
        }
    }
    if let Some(index) = params.group_col_index {
        form.push("group_col_index", index.to_string());
    }
    let model_name = params.model_name.trim();
    if !model_name.is_empty() {
        form.push("model_name", model_name);
    }
    form.push("batch_size", params.batch_size.to_string());
    form.push("max_len", params.max_len.to_string());
    if let Some(max_rows) = params.max_rows {
        form.push("max_rows", max_rows.to_string());
    }
    if let Some(port) = params.metrics_port {
        form.push("metrics_port", port.to_string());
    }
    Ok(form)
}

/// Submission state of the run form.
#[derive(Debug, Default)]
pub(crate) struct RunController {
    busy: bool,
    error: Option<RunSubmitError>,
    last_started: Option<RunStartResponse>,
}

impl RunController {
    pub(crate) fn busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn error(&self) -> Option<&RunSubmitError> {
        self.error.as_ref()
    }

    pub(crate) fn last_started(&self) -> Option<&RunStartResponse> {
        self.last_started.as_ref()
    }

    /// Validate and mark the form busy. A rejected submission leaves the
    /// in-flight one untouched.
    pub(crate) fn begin(
        &mut self,
        request: &RunRequest,
        defaults: &RunDefaults,
    ) -> Result<RunForm, RunSubmitError> {
        if self.busy {
            return Err(RunSubmitError::Busy);
        }
        match build_run_form(request, defaults) {
            Ok(form) => {
                self.busy = true;
                self.error = None;
                Ok(form)
            }
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Record the outcome; returns the response on success.
    pub(crate) fn finish(&mut self, message: RunStartResult) -> Option<RunStartResponse> {
        self.busy = false;
        match message.result {
            Ok(response) => {
                tracing::info!(
                    "Run started (pid {:?}), writing {}",
                    response.pid,
                    response.output_csv
                );
                self.last_started = Some(response.clone());
                Some(response)
            }
            Err(err) => {
                tracing::warn!("Run submission failed: {err}");
                self.error = Some(RunSubmitError::Server(err.user_message(START_RUN_FAILED)));
                None
            }
        }
    }

    pub(crate) fn reset_busy(&mut self) {
        self.busy = false;
    }
}

pub(crate) fn spawn_start_run(api: Arc<dyn DashboardApi>, form: RunForm, tx: Sender<JobMessage>) {
    thread::spawn(move || {
        let result = api.start_run(&form);
        let _ = tx.send(JobMessage::RunStarted(RunStartResult { result }));
    });
}

/// Best-effort cancel; failures are logged and dropped.
pub(crate) fn spawn_cancel_run(api: Arc<dyn DashboardApi>) {
    thread::spawn(move || match api.cancel_run() {
        Ok(()) => tracing::info!("Cancel requested"),
        Err(err) => tracing::debug!("Cancel request failed: {err}"),
    });
}
