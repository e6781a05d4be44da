use std::collections::BTreeSet;

use crate::telemetry::RunRecord;

/// Intensity assigned to the smallest filled cell.
pub const BASE_INTENSITY: f64 = 0.15;
const INTENSITY_RANGE: f64 = 1.0 - BASE_INTENSITY;

/// Mean throughput over batch size (rows) × max length (columns).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThroughputHeatmap {
    pub batch_sizes: Vec<u32>,
    pub max_lens: Vec<u32>,
    /// Row-major cells; `None` where no run matched.
    pub cells: Vec<Vec<Option<f64>>>,
}

/// Min and max over the filled cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeatmapScale {
    pub min: f64,
    pub max: f64,
}

impl ThroughputHeatmap {
    /// Build from the comparison subset. Runs without a positive runtime are
    /// skipped even if the caller passes them in.
    pub fn build(runs: &[RunRecord]) -> Self {
        let runs: Vec<&RunRecord> = runs.iter().filter(|run| run.runtime_s > 0.0).collect();
        let batch_sizes: Vec<u32> = runs
            .iter()
            .map(|run| run.batch_size)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let max_lens: Vec<u32> = runs
            .iter()
            .map(|run| run.max_len)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let cells = batch_sizes
            .iter()
            .map(|&batch_size| {
                max_lens
                    .iter()
                    .map(|&max_len| mean_throughput(&runs, batch_size, max_len))
                    .collect()
            })
            .collect();
        Self {
            batch_sizes,
            max_lens,
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batch_sizes.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    fn filled(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().flatten().filter_map(|cell| *cell)
    }

    /// Zero/zero when no cell is filled.
    pub fn scale(&self) -> HeatmapScale {
        let mut values = self.filled();
        let Some(first) = values.next() else {
            return HeatmapScale::default();
        };
        values.fold(
            HeatmapScale {
                min: first,
                max: first,
            },
            |scale, value| HeatmapScale {
                min: scale.min.min(value),
                max: scale.max.max(value),
            },
        )
    }

    /// Color intensity in `[BASE_INTENSITY, 1]` for a cell value.
    pub fn intensity(&self, value: Option<f64>) -> f64 {
        self.scale().intensity(value)
    }
}

impl HeatmapScale {
    pub fn intensity(&self, value: Option<f64>) -> f64 {
        let Some(value) = value else {
            return BASE_INTENSITY;
        };
        let span = self.max - self.min;
        if span <= 0.0 {
            return BASE_INTENSITY;
        }
        let normalized = ((value - self.min) / span).clamp(0.0, 1.0);
        BASE_INTENSITY + INTENSITY_RANGE * normalized
    }
}

fn mean_throughput(runs: &[&RunRecord], batch_size: u32, max_len: u32) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for run in runs
        .iter()
        .filter(|run| run.batch_size == batch_size && run.max_len == max_len)
    {
        sum += run.throughput();
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}
