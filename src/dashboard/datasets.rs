//! Dataset options and the latest run per dataset.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::aggregate::DatasetSelection;
use crate::telemetry::RunRecord;
use crate::telemetry::timestamp::parse_timestamp;

/// Most recent run seen for one dataset key.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestRun {
    pub dataset: String,
    pub run: RunRecord,
}

/// Output file to load artifacts from for one dataset.
///
/// The run timestamp is part of the identity so a newer run writing to the
/// same path still triggers a reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOutput {
    pub dataset: String,
    pub output_csv: String,
    pub run_timestamp: String,
}

/// `All` followed by the sorted distinct dataset tags. Untagged runs and empty
/// tags add no option.
pub fn dataset_options(runs: &[RunRecord]) -> Vec<DatasetSelection> {
    let tags: BTreeSet<&str> = runs
        .iter()
        .filter_map(|run| run.dataset_type.as_deref())
        .filter(|tag| !tag.is_empty())
        .collect();
    std::iter::once(DatasetSelection::All)
        .chain(
            tags.into_iter()
                .map(|tag| DatasetSelection::Dataset(tag.to_string())),
        )
        .collect()
}

/// Latest run per dataset key, in order of first appearance.
///
/// A run replaces the incumbent only when its timestamp parses and is
/// strictly newer, or when the incumbent's timestamp does not parse but its
/// own does.
pub fn latest_runs_by_dataset(runs: &[RunRecord]) -> Vec<LatestRun> {
    let mut latest: Vec<(LatestRun, Option<OffsetDateTime>)> = Vec::new();
    for run in runs {
        let parsed = parse_timestamp(&run.timestamp);
        let dataset = run.dataset_key();
        match latest.iter_mut().find(|(entry, _)| entry.dataset == dataset) {
            None => latest.push((
                LatestRun {
                    dataset: dataset.to_string(),
                    run: run.clone(),
                },
                parsed,
            )),
            Some((entry, incumbent)) => {
                if replaces(parsed, *incumbent) {
                    entry.run = run.clone();
                    *incumbent = parsed;
                }
            }
        }
    }
    latest.into_iter().map(|(entry, _)| entry).collect()
}

fn replaces(candidate: Option<OffsetDateTime>, incumbent: Option<OffsetDateTime>) -> bool {
    match (candidate, incumbent) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(candidate), Some(incumbent)) => candidate > incumbent,
    }
}

/// Artifact targets for the selection: every dataset with an output under
/// `All`, the selected dataset alone otherwise.
pub fn dataset_outputs(latest: &[LatestRun], selection: &DatasetSelection) -> Vec<DatasetOutput> {
    let output = |entry: &LatestRun| DatasetOutput {
        dataset: entry.dataset.clone(),
        output_csv: entry.run.output_csv.clone(),
        run_timestamp: entry.run.timestamp.clone(),
    };
    match selection {
        DatasetSelection::All => latest
            .iter()
            .filter(|entry| !entry.run.output_csv.is_empty())
            .map(output)
            .collect(),
        DatasetSelection::Dataset(name) => latest
            .iter()
            .find(|entry| &entry.dataset == name)
            .filter(|entry| !entry.run.output_csv.is_empty())
            .map(output)
            .into_iter()
            .collect(),
    }
}

/// Reset a selection that is no longer offered to `All`.
pub fn reconcile_selection(
    selection: &DatasetSelection,
    options: &[DatasetSelection],
) -> DatasetSelection {
    if selection.is_all() || options.contains(selection) {
        selection.clone()
    } else {
        DatasetSelection::All
    }
}
