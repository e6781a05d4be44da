use serde::{Deserialize, Serialize};

/// Dataset key used for runs that carry no dataset tag.
pub const UNKNOWN_DATASET: &str = "unknown";

/// Lifecycle state reported for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Starting,
    Running,
    Complete,
    Failed,
    Cancelled,
    Idle,
    /// Any status text this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl RunState {
    /// True once the job can no longer make progress.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Idle => "idle",
            Self::Unknown => "unknown",
        }
    }
}

/// One job execution, either finished (history) or in flight (live snapshot).
///
/// Records are produced by the service and never mutated locally. Every field
/// except the core counters is defaulted so partially written history lines
/// still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// History lines written by the job omit the status; live snapshots carry it.
    #[serde(default)]
    pub status: Option<RunState>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub input_csv: String,
    #[serde(default)]
    pub output_csv: String,
    #[serde(default)]
    pub text_col: Option<String>,
    #[serde(default)]
    pub group_col: Option<String>,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub batch_size: u32,
    #[serde(default)]
    pub max_len: u32,
    #[serde(default)]
    pub max_rows: Option<u64>,
    #[serde(default)]
    pub metrics_port: Option<u16>,
    #[serde(default)]
    pub dataset_type: Option<String>,
    #[serde(default)]
    pub rows_seen: u64,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub skipped: Option<u64>,
    #[serde(default)]
    pub invalid: Option<u64>,
    #[serde(default)]
    pub avg_score: Option<f64>,
    #[serde(default)]
    pub positive: Option<u64>,
    #[serde(default)]
    pub negative: Option<u64>,
    #[serde(default)]
    pub neutral: Option<u64>,
    #[serde(default)]
    pub runtime_s: f64,
    #[serde(default)]
    pub error_samples: Vec<String>,
}

/// A run record delivered over the push stream while the job is in flight.
pub type LiveSnapshot = RunRecord;

impl RunRecord {
    /// Dataset grouping key, falling back to [`UNKNOWN_DATASET`].
    pub fn dataset_key(&self) -> &str {
        self.dataset_type.as_deref().unwrap_or(UNKNOWN_DATASET)
    }

    /// Rows per second, zero when the runtime is not positive.
    pub fn throughput(&self) -> f64 {
        if self.runtime_s > 0.0 {
            self.processed as f64 / self.runtime_s
        } else {
            0.0
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(RunState::is_terminal)
    }

    /// Check the counter invariants the service promises.
    pub fn is_consistent(&self) -> bool {
        let sentiment = self
            .positive
            .unwrap_or(0)
            .saturating_add(self.negative.unwrap_or(0))
            .saturating_add(self.neutral.unwrap_or(0));
        self.processed.saturating_add(self.failed) <= self.rows_seen
            && self.runtime_s >= 0.0
            && sentiment <= self.processed
    }
}

/// Process-supervision view of the job runner. Always describes "now".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub log_tail: String,
    #[serde(default)]
    pub log_path: Option<String>,
}

#[cfg(test)]
pub(crate) fn sample_run(batch_size: u32, max_len: u32, processed: u64) -> RunRecord {
    RunRecord {
        status: Some(RunState::Complete),
        timestamp: "2025-01-01T00:00:00+0000".to_string(),
        input_csv: "input.csv".to_string(),
        output_csv: "output/predictions.csv".to_string(),
        text_col: Some("Text".to_string()),
        group_col: None,
        model_name: "distilbert".to_string(),
        batch_size,
        max_len,
        max_rows: None,
        metrics_port: None,
        dataset_type: None,
        rows_seen: processed,
        processed,
        failed: 0,
        skipped: None,
        invalid: None,
        avg_score: None,
        positive: None,
        negative: None,
        neutral: None,
        runtime_s: 0.0,
        error_samples: Vec::new(),
    }
}
