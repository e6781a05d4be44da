#![deny(missing_docs)]
#![deny(warnings)]

//! Headless watcher: follows the job service and logs the derived views.
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use runboard::aggregate::{DatasetSelection, GroupedScoreRow};
use runboard::api::{DashboardApi, HttpDashboardApi};
use runboard::config;
use runboard::dashboard::Dashboard;
use runboard::logging;
use runboard::telemetry::timestamp::format_short_timestamp;

const TICK: Duration = Duration::from_millis(250);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("File logging disabled: {err}");
        if let Err(err) = logging::init_stdout_only() {
            eprintln!("Logging disabled: {err}");
        }
    }

    let args = WatchArgs::parse(std::env::args().skip(1))?;
    let settings = config::load_or_default()?;
    let api: Arc<dyn DashboardApi> = Arc::new(HttpDashboardApi::new(&settings.base_url)?);
    let mut dashboard = Dashboard::new(api, settings);
    if let Some(query) = args.query.as_deref() {
        dashboard.set_query(query);
    }
    dashboard.activate();

    // Applied once history has loaded; before that every dataset filter is orphaned.
    let mut pending_dataset = args.dataset.clone();
    let mut last = None;
    loop {
        let mut changed = dashboard.poll() > 0;
        if !dashboard.history().loading() {
            if let Some(dataset) = pending_dataset.take() {
                dashboard.set_dataset_filter(DatasetSelection::parse(&dataset));
                changed = true;
            }
        }
        if changed {
            let summary = WatchSummary::capture(&dashboard);
            if last.as_ref() != Some(&summary) {
                summary.log();
                last = Some(summary);
            }
        }
        let settled = !dashboard.history().loading() && !dashboard.artifacts().loading();
        if args.once && settled && last.is_some() {
            break;
        }
        thread::sleep(TICK);
    }
    dashboard.deactivate();
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct WatchArgs {
    query: Option<String>,
    dataset: Option<String>,
    once: bool,
}

impl WatchArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => parsed.once = true,
                "--query" => parsed.query = Some(value_for(&arg, args.next())?),
                "--dataset" => parsed.dataset = Some(value_for(&arg, args.next())?),
                other => return Err(format!("Unknown argument: {other}")),
            }
        }
        Ok(parsed)
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} expects a value"))
}

/// Batch size, max length, runs, processed rows, formatted average score.
type GroupedLine = (u32, u32, u64, u64, String);

fn grouped_lines(rows: &[GroupedScoreRow]) -> Vec<GroupedLine> {
    rows.iter()
        .map(|row| {
            (
                row.batch_size,
                row.max_len,
                row.runs,
                row.processed,
                format!("{:.3}", row.avg_score()),
            )
        })
        .collect()
}

/// What the watcher reports; logged again only when it changes.
#[derive(Debug, PartialEq)]
struct WatchSummary {
    running: Option<bool>,
    live_status: Option<&'static str>,
    live_processed: Option<u64>,
    runs: usize,
    selection: String,
    latest: Vec<(String, String)>,
    grouped: Vec<GroupedLine>,
    artifacts: Vec<(String, usize, bool)>,
    error: Option<String>,
}

impl WatchSummary {
    fn capture(dashboard: &Dashboard) -> Self {
        let views = dashboard.views();
        Self {
            running: dashboard.run_status().map(|status| status.running),
            live_status: dashboard
                .live_snapshot()
                .and_then(|live| live.status)
                .map(|state| state.as_str()),
            live_processed: dashboard.live_snapshot().map(|live| live.processed),
            runs: dashboard.runs().len(),
            selection: views.selection.to_string(),
            latest: dashboard
                .latest_runs()
                .iter()
                .map(|latest| {
                    (
                        latest.dataset.clone(),
                        format_short_timestamp(&latest.run.timestamp),
                    )
                })
                .collect(),
            grouped: grouped_lines(&views.grouped_rows),
            artifacts: dashboard
                .artifacts()
                .entries()
                .iter()
                .map(|entry| {
                    (
                        entry.dataset.clone(),
                        entry.predictions.len(),
                        entry.summary.is_some(),
                    )
                })
                .collect(),
            error: dashboard.history().error().map(str::to_string),
        }
    }

    fn log(&self) {
        tracing::info!(
            "Status running={:?} live={} processed={:?}",
            self.running,
            self.live_status.unwrap_or("-"),
            self.live_processed
        );
        tracing::info!("History: {} runs, filter '{}'", self.runs, self.selection);
        if let Some(error) = &self.error {
            tracing::warn!("History error: {error}");
        }
        for (dataset, when) in &self.latest {
            tracing::info!("  latest {dataset} run: {when}");
        }
        for (batch_size, max_len, runs, processed, avg) in &self.grouped {
            tracing::info!(
                "  batch {batch_size} / len {max_len}: {runs} runs, {processed} rows, avg score {avg}"
            );
        }
        for (dataset, rows, has_summary) in &self.artifacts {
            tracing::info!(
                "  {dataset}: {rows} prediction rows, summary {}",
                if *has_summary { "loaded" } else { "missing" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_watch_flags() {
        let parsed = WatchArgs::parse(args(&["--query", "reviews", "--once"])).unwrap();
        assert_eq!(parsed.query.as_deref(), Some("reviews"));
        assert!(parsed.once);
        assert_eq!(parsed.dataset, None);
    }

    #[test]
    fn grouped_lines_carry_run_counts_and_average() {
        let row = GroupedScoreRow {
            batch_size: 32,
            max_len: 256,
            runs: 2,
            processed: 150,
            positive: 110,
            negative: 40,
            neutral: 0,
            score_sum: 110.0,
        };
        assert_eq!(
            grouped_lines(&[row]),
            vec![(32, 256, 2, 150, "0.733".to_string())]
        );
        assert!(grouped_lines(&[]).is_empty());
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(WatchArgs::parse(args(&["--verbose"])).is_err());
        assert_eq!(
            WatchArgs::parse(args(&["--dataset"])),
            Err("--dataset expects a value".to_string())
        );
    }
}
