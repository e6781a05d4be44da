use crate::telemetry::RunRecord;

/// Summed sentiment counts across a run selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SentimentTotals {
    pub processed: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

/// Sentiment shares as percentages of processed rows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SentimentShares {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentTotals {
    pub fn from_runs(runs: &[RunRecord]) -> Self {
        runs.iter().fold(Self::default(), |mut totals, run| {
            totals.processed += run.processed;
            totals.positive += run.positive.unwrap_or(0);
            totals.negative += run.negative.unwrap_or(0);
            totals.neutral += run.neutral.unwrap_or(0);
            totals
        })
    }

    /// Percent shares; a zero processed total divides by 1 instead.
    pub fn shares(&self) -> SentimentShares {
        let divisor = self.processed.max(1) as f64;
        SentimentShares {
            positive: self.positive as f64 / divisor * 100.0,
            negative: self.negative as f64 / divisor * 100.0,
            neutral: self.neutral as f64 / divisor * 100.0,
        }
    }
}
