//! Wire-level data model shared by the API client, the stores, and the
//! aggregation layer.

mod artifacts;
mod record;
pub mod timestamp;

pub use artifacts::{
    DatasetArtifacts, GroupSummary, GroupSummaryEntry, ModelInfo, PredictionRow, RunStartResponse,
};
pub use record::{LiveSnapshot, RunRecord, RunState, RunStatus, UNKNOWN_DATASET};

#[cfg(test)]
pub(crate) use record::sample_run;
