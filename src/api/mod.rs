//! Client side of the dashboard service contract.
//!
//! [`DashboardApi`] is the seam between the stores and the network: the
//! production implementation is [`HttpDashboardApi`], tests substitute
//! in-memory fakes.

mod client;
mod multipart;
mod paths;
pub(crate) mod sse;

pub use client::HttpDashboardApi;
pub use multipart::RunForm;
pub use paths::{SUMMARY_SUFFIX, build_summary_path};

use crate::telemetry::{
    GroupSummary, ModelInfo, PredictionRow, RunRecord, RunStartResponse, RunStatus,
};

/// Errors reported by [`DashboardApi`] calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("HTTP error: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("HTTP {code}: {}", .server_error.as_deref().unwrap_or("no details"))]
    Status {
        code: u16,
        /// The `error` field of the response body, when present.
        server_error: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("JSON error: {0}")]
    Json(String),
    /// Local I/O failed (reading an upload or a response body).
    #[error("I/O error: {0}")]
    Io(String),
}

impl ApiError {
    /// Message for the operator: the server's own words when it sent any,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                server_error: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Outcome of waiting on a push connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPoll {
    /// One complete message payload.
    Message(String),
    /// Nothing arrived within the idle tick; the connection is still open.
    Idle,
    /// The server ended the stream.
    Closed,
}

/// A server-push connection delivering raw message payloads.
pub trait LiveStream: Send {
    fn poll_message(&mut self) -> Result<StreamPoll, ApiError>;
}

/// Operations the dashboard needs from the service. Every call blocks.
pub trait DashboardApi: Send + Sync {
    /// `GET /api/runs?q=`: history records matching a free-text query.
    fn fetch_runs(&self, query: &str) -> Result<Vec<RunRecord>, ApiError>;
    /// `GET /api/run/status`.
    fn fetch_run_status(&self) -> Result<RunStatus, ApiError>;
    /// `GET /api/live/stream`: opens the push connection.
    fn open_live_stream(&self) -> Result<Box<dyn LiveStream>, ApiError>;
    /// `GET /api/predictions?path=&limit=`.
    fn fetch_predictions(
        &self,
        path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PredictionRow>, ApiError>;
    /// `GET /api/summary?path=`.
    fn fetch_summary(&self, path: &str) -> Result<Option<GroupSummary>, ApiError>;
    /// `GET /api/models`.
    fn fetch_models(&self) -> Result<Vec<ModelInfo>, ApiError>;
    /// `POST /api/run` as a multipart upload.
    fn start_run(&self, form: &RunForm) -> Result<RunStartResponse, ApiError>;
    /// `POST /api/run/cancel`.
    fn cancel_run(&self) -> Result<(), ApiError>;
}
