use ordered_float::OrderedFloat;

use crate::telemetry::{GroupSummary, PredictionRow};

/// How many rows a table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLimit {
    #[default]
    All,
    Rows(usize),
}

impl RowLimit {
    /// `None` (or zero) means no limit.
    pub fn from_option(limit: Option<usize>) -> Self {
        match limit {
            Some(rows) if rows > 0 => Self::Rows(rows),
            _ => Self::All,
        }
    }

    pub fn max_rows(self) -> usize {
        match self {
            Self::All => usize::MAX,
            Self::Rows(rows) => rows,
        }
    }
}

/// Ordering applied to the predictions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreSort {
    /// Server order.
    #[default]
    None,
    Ascending,
    Descending,
}

/// Coarse sentiment bucket for a label value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentClass {
    Positive,
    Negative,
    Average,
}

impl SentimentClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Average => "average",
        }
    }
}

/// Classify a label by substring: `pos` before `neg`, anything else is average.
pub fn sentiment_class(label: &str) -> SentimentClass {
    let label = label.to_lowercase();
    if label.contains("pos") {
        SentimentClass::Positive
    } else if label.contains("neg") {
        SentimentClass::Negative
    } else {
        SentimentClass::Average
    }
}

/// Column names in first-seen order across `rows`.
pub fn column_keys(rows: &[PredictionRow]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.clone());
        }
    }
    keys
}

/// Numeric `score` of a row; missing, non-numeric and non-finite scores are 0.
pub fn row_score(row: &PredictionRow) -> f64 {
    row.get("score")
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .unwrap_or(0.0)
}

/// Score as a whole percentage in `[0, 100]`.
pub fn score_percent(row: &PredictionRow) -> u32 {
    (row_score(row) * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Stable sort by score; ties keep server order.
pub fn sort_predictions(rows: &[PredictionRow], sort: ScoreSort) -> Vec<PredictionRow> {
    let mut sorted = rows.to_vec();
    match sort {
        ScoreSort::None => {}
        ScoreSort::Ascending => sorted.sort_by_key(|row| OrderedFloat(row_score(row))),
        ScoreSort::Descending => {
            sorted.sort_by_key(|row| std::cmp::Reverse(OrderedFloat(row_score(row))))
        }
    }
    sorted
}

/// Sort then truncate for display.
pub fn shape_predictions(
    rows: &[PredictionRow],
    sort: ScoreSort,
    limit: RowLimit,
) -> Vec<PredictionRow> {
    let mut shaped = sort_predictions(rows, sort);
    shaped.truncate(limit.max_rows());
    shaped
}

/// Copy of `summary` keeping only the first `limit` groups.
pub fn limit_summary_groups(summary: &GroupSummary, limit: RowLimit) -> GroupSummary {
    let mut limited = summary.clone();
    limited.groups.truncate(limit.max_rows());
    limited
}
