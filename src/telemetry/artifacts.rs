use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One labelled output row, columns in the order the CSV header lists them.
pub type PredictionRow = IndexMap<String, String>;

/// Per-group totals written next to a predictions CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    #[serde(default)]
    pub dataset_type: String,
    #[serde(default)]
    pub group_col: Option<String>,
    #[serde(default)]
    pub groups: Vec<GroupSummaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummaryEntry {
    pub group: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub positive: u64,
    #[serde(default)]
    pub negative: u64,
    #[serde(default)]
    pub avg_score: f64,
}

impl GroupSummaryEntry {
    /// Average score as a bar width in percent, clamped to `[0, 100]`.
    pub fn avg_score_percent(&self) -> f64 {
        (self.avg_score * 100.0).clamp(0.0, 100.0)
    }
}

/// Predictions and summary loaded for the latest run of one dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetArtifacts {
    pub dataset: String,
    pub output_csv: String,
    /// Empty when the predictions fetch failed.
    pub predictions: Vec<PredictionRow>,
    /// `None` when there is no summary or its fetch failed.
    pub summary: Option<GroupSummary>,
}

/// Model catalog entry offered by the run form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub downloads: u64,
}

/// Acknowledgement returned when a job was started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStartResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub input_csv: String,
    pub output_csv: String,
    #[serde(default)]
    pub summary_path: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub log_path: Option<String>,
}
