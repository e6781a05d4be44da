use crate::telemetry::RunRecord;

use super::RowLimit;

/// One run on the batch size vs. max length scatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    /// Max sequence length.
    pub x: u32,
    /// Batch size.
    pub y: u32,
    /// Rows per second, shown alongside the point.
    pub throughput: f64,
}

/// A timestamp-labelled value for the runtime/processed timelines.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

pub fn scatter_points(runs: &[RunRecord]) -> Vec<ScatterPoint> {
    runs.iter()
        .map(|run| ScatterPoint {
            x: run.max_len,
            y: run.batch_size,
            throughput: run.throughput(),
        })
        .collect()
}

pub fn runtime_series(runs: &[RunRecord]) -> Vec<SeriesPoint> {
    series(runs, |run| run.runtime_s)
}

pub fn processed_series(runs: &[RunRecord]) -> Vec<SeriesPoint> {
    series(runs, |run| run.processed as f64)
}

fn series(runs: &[RunRecord], value: impl Fn(&RunRecord) -> f64) -> Vec<SeriesPoint> {
    runs.iter()
        .map(|run| SeriesPoint {
            label: run.timestamp.clone(),
            value: value(run),
        })
        .collect()
}

/// Newest-first view of `runs` (history is returned oldest-first).
pub fn recent_runs(runs: &[RunRecord], limit: RowLimit) -> Vec<RunRecord> {
    runs.iter()
        .rev()
        .take(limit.max_rows())
        .cloned()
        .collect()
}
