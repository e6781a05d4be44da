use std::fmt;

use crate::telemetry::RunRecord;

/// Text form of [`DatasetSelection::All`].
pub const ALL_DATASETS: &str = "all";

/// Active dataset filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DatasetSelection {
    #[default]
    All,
    Dataset(String),
}

impl DatasetSelection {
    /// Parse a filter value, treating `"all"` (and blank text) as the sentinel.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == ALL_DATASETS {
            Self::All
        } else {
            Self::Dataset(text.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_DATASETS,
            Self::Dataset(name) => name,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// True when `run` is visible under this filter.
    ///
    /// A specific filter only matches runs whose tag equals it; untagged runs
    /// are visible under `All` only.
    pub fn matches(&self, run: &RunRecord) -> bool {
        match self {
            Self::All => true,
            Self::Dataset(name) => run.dataset_type.as_deref() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for DatasetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs visible under `selection`, in their original order.
pub fn filter_runs(runs: &[RunRecord], selection: &DatasetSelection) -> Vec<RunRecord> {
    runs.iter()
        .filter(|run| selection.matches(run))
        .cloned()
        .collect()
}

/// Runs with a strictly positive runtime; throughput is undefined for the rest.
pub fn comparison_runs(runs: &[RunRecord]) -> Vec<RunRecord> {
    runs.iter()
        .filter(|run| run.runtime_s > 0.0)
        .cloned()
        .collect()
}
