//! Pure derivations over the current run selection.
//!
//! Nothing here holds state: [`DashboardViews::compute`] is re-run after every
//! transition that can change its inputs.

mod grouped;
mod heatmap;
mod predictions;
mod selection;
mod sentiment;
mod series;

pub use grouped::{GroupedScoreRow, grouped_score_rows};
pub use heatmap::{BASE_INTENSITY, HeatmapScale, ThroughputHeatmap};
pub use predictions::{
    RowLimit, ScoreSort, SentimentClass, column_keys, limit_summary_groups, row_score,
    score_percent, sentiment_class, shape_predictions, sort_predictions,
};
pub use selection::{ALL_DATASETS, DatasetSelection, comparison_runs, filter_runs};
pub use sentiment::{SentimentShares, SentimentTotals};
pub use series::{
    ScatterPoint, SeriesPoint, processed_series, recent_runs, runtime_series, scatter_points,
};

use crate::config::ViewSettings;
use crate::telemetry::{DatasetArtifacts, GroupSummary, PredictionRow, RunRecord};

/// Table shaping chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewOptions {
    pub recent_limit: RowLimit,
    pub predictions_limit: RowLimit,
    pub prediction_sort: ScoreSort,
    pub summary_limit: RowLimit,
}

impl ViewOptions {
    pub fn from_settings(settings: &ViewSettings) -> Self {
        Self {
            recent_limit: RowLimit::from_option(settings.recent_limit),
            predictions_limit: RowLimit::from_option(settings.predictions_limit),
            prediction_sort: ScoreSort::None,
            summary_limit: RowLimit::from_option(settings.summary_limit),
        }
    }
}

/// Predictions table for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSection {
    pub dataset: String,
    pub columns: Vec<String>,
    /// Sorted and limited rows.
    pub rows: Vec<PredictionRow>,
    /// Row count before limiting.
    pub total_rows: usize,
}

/// Group summary table for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySection {
    pub dataset: String,
    pub summary: Option<GroupSummary>,
}

/// Everything the view layer renders, derived from one consistent input set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardViews {
    pub selection: DatasetSelection,
    pub filtered_runs: usize,
    pub grouped_rows: Vec<GroupedScoreRow>,
    pub comparison_runs: usize,
    pub heatmap: ThroughputHeatmap,
    pub heatmap_scale: HeatmapScale,
    pub sentiment: SentimentTotals,
    pub sentiment_shares: SentimentShares,
    pub scatter: Vec<ScatterPoint>,
    pub runtime_series: Vec<SeriesPoint>,
    pub processed_series: Vec<SeriesPoint>,
    pub recent_runs: Vec<RunRecord>,
    pub predictions: Vec<PredictionSection>,
    pub summaries: Vec<SummarySection>,
}

impl DashboardViews {
    pub fn compute(
        runs: &[RunRecord],
        selection: &DatasetSelection,
        artifacts: &[DatasetArtifacts],
        options: &ViewOptions,
    ) -> Self {
        let filtered = filter_runs(runs, selection);
        let comparison = comparison_runs(&filtered);
        let heatmap = ThroughputHeatmap::build(&comparison);
        let heatmap_scale = heatmap.scale();
        let sentiment = SentimentTotals::from_runs(&filtered);
        let predictions = artifacts
            .iter()
            .map(|entry| PredictionSection {
                dataset: entry.dataset.clone(),
                columns: column_keys(&entry.predictions),
                rows: shape_predictions(
                    &entry.predictions,
                    options.prediction_sort,
                    options.predictions_limit,
                ),
                total_rows: entry.predictions.len(),
            })
            .collect();
        let summaries = artifacts
            .iter()
            .map(|entry| SummarySection {
                dataset: entry.dataset.clone(),
                summary: entry
                    .summary
                    .as_ref()
                    .map(|summary| limit_summary_groups(summary, options.summary_limit)),
            })
            .collect();
        Self {
            selection: selection.clone(),
            filtered_runs: filtered.len(),
            grouped_rows: grouped_score_rows(&filtered),
            comparison_runs: comparison.len(),
            heatmap_scale,
            heatmap,
            sentiment_shares: sentiment.shares(),
            sentiment,
            scatter: scatter_points(&comparison),
            runtime_series: runtime_series(&filtered),
            processed_series: processed_series(&filtered),
            recent_runs: recent_runs(&filtered, options.recent_limit),
            predictions,
            summaries,
        }
    }
}
