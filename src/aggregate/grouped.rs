use std::collections::BTreeMap;

use crate::telemetry::RunRecord;

/// Sentiment and score totals for one `(batch_size, max_len)` configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedScoreRow {
    pub batch_size: u32,
    pub max_len: u32,
    pub runs: u64,
    pub processed: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    /// `Σ avg_score × processed` over the group's runs.
    pub score_sum: f64,
}

impl GroupedScoreRow {
    fn empty(batch_size: u32, max_len: u32) -> Self {
        Self {
            batch_size,
            max_len,
            runs: 0,
            processed: 0,
            positive: 0,
            negative: 0,
            neutral: 0,
            score_sum: 0.0,
        }
    }

    fn add(&mut self, run: &RunRecord) {
        self.runs += 1;
        self.processed += run.processed;
        self.positive += run.positive.unwrap_or(0);
        self.negative += run.negative.unwrap_or(0);
        self.neutral += run.neutral.unwrap_or(0);
        self.score_sum += run.avg_score.unwrap_or(0.0) * run.processed as f64;
    }

    /// Processed-weighted mean score.
    pub fn avg_score(&self) -> f64 {
        if self.processed == 0 {
            return 0.0;
        }
        self.score_sum / self.processed as f64
    }

    pub fn avg_score_percent(&self) -> f64 {
        (self.avg_score() * 100.0).clamp(0.0, 100.0)
    }

    pub fn positive_rate(&self) -> f64 {
        percent_of(self.positive, self.processed)
    }

    pub fn negative_rate(&self) -> f64 {
        percent_of(self.negative, self.processed)
    }

    pub fn neutral_rate(&self) -> f64 {
        percent_of(self.neutral, self.processed)
    }
}

/// `100 × count / total`, zero when `total` is zero.
pub(crate) fn percent_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * count as f64 / total as f64).clamp(0.0, 100.0)
}

/// Group runs by `(batch_size, max_len)`, sorted by batch size then max length.
pub fn grouped_score_rows(runs: &[RunRecord]) -> Vec<GroupedScoreRow> {
    let mut grouped: BTreeMap<(u32, u32), GroupedScoreRow> = BTreeMap::new();
    for run in runs {
        grouped
            .entry((run.batch_size, run.max_len))
            .or_insert_with(|| GroupedScoreRow::empty(run.batch_size, run.max_len))
            .add(run);
    }
    grouped.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sample_run;

    fn scored(batch_size: u32, max_len: u32, processed: u64, avg_score: f64) -> RunRecord {
        let mut run = sample_run(batch_size, max_len, processed);
        run.avg_score = Some(avg_score);
        run
    }

    #[test]
    fn weighted_average_recovers_per_group_score() {
        let runs = vec![
            scored(32, 256, 100, 0.8),
            scored(64, 256, 200, 0.9),
            scored(32, 256, 50, 0.6),
        ];
        let rows = grouped_score_rows(&runs);
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].batch_size, rows[0].max_len), (32, 256));
        assert_eq!(rows[0].runs, 2);
        assert_eq!(rows[0].processed, 150);
        assert!((rows[0].avg_score() - 110.0 / 150.0).abs() < 1e-9);
        assert_eq!((rows[1].batch_size, rows[1].max_len), (64, 256));
        assert_eq!(rows[1].runs, 1);
        assert!((rows[1].avg_score() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn rows_sort_by_batch_then_length() {
        let runs = vec![
            sample_run(64, 128, 1),
            sample_run(16, 512, 1),
            sample_run(16, 128, 1),
        ];
        let keys: Vec<_> = grouped_score_rows(&runs)
            .iter()
            .map(|row| (row.batch_size, row.max_len))
            .collect();
        assert_eq!(keys, vec![(16, 128), (16, 512), (64, 128)]);
    }

    #[test]
    fn zero_processed_yields_zero_rates() {
        let mut run = sample_run(8, 64, 0);
        run.positive = Some(0);
        run.avg_score = Some(0.7);
        let rows = grouped_score_rows(&[run]);
        let row = &rows[0];
        assert_eq!(row.avg_score(), 0.0);
        assert_eq!(row.positive_rate(), 0.0);
        assert_eq!(row.negative_rate(), 0.0);
        assert_eq!(row.neutral_rate(), 0.0);
        assert!(!row.avg_score_percent().is_nan());
    }

    #[test]
    fn rates_are_percentages_of_processed() {
        let mut run = sample_run(32, 256, 200);
        run.positive = Some(150);
        run.negative = Some(40);
        run.neutral = Some(10);
        let rows = grouped_score_rows(&[run]);
        assert_eq!(rows[0].positive_rate(), 75.0);
        assert_eq!(rows[0].negative_rate(), 20.0);
        assert_eq!(rows[0].neutral_rate(), 5.0);
    }

    #[test]
    fn missing_counts_are_treated_as_zero() {
        let rows = grouped_score_rows(&[sample_run(32, 256, 10)]);
        assert_eq!(rows[0].positive, 0);
        assert_eq!(rows[0].score_sum, 0.0);
    }
}
