use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::{
    MAX_PREDICTIONS_FETCH_LIMIT, clamp_poll_interval_ms, default_base_url, default_batch_size,
    default_max_len, default_model_name, default_output_csv, default_predictions_fetch_limit,
    default_predictions_limit, default_recent_limit, default_status_poll_interval_ms,
    default_summary_limit, default_text_col,
};

/// Dashboard settings loaded from `config.toml`.
///
/// Config keys (TOML): `base_url`, `status_poll_interval_ms`,
/// `predictions_fetch_limit`, `[run_defaults]`, `[views]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Root URL of the dashboard service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Delay between run status checks.
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
    /// Row cap requested per predictions fetch (`0` = server default).
    #[serde(default = "default_predictions_fetch_limit")]
    pub predictions_fetch_limit: Option<usize>,
    /// Initial values for the run form.
    #[serde(default)]
    pub run_defaults: RunDefaults,
    /// Row limits for tables.
    #[serde(default)]
    pub views: ViewSettings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            predictions_fetch_limit: default_predictions_fetch_limit(),
            run_defaults: RunDefaults::default(),
            views: ViewSettings::default(),
        }
    }
}

impl DashboardSettings {
    /// Clamp and tidy values loaded from disk or the environment.
    pub fn normalized(mut self) -> Self {
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if self.base_url.is_empty() {
            self.base_url = default_base_url();
        }
        self.status_poll_interval_ms = clamp_poll_interval_ms(self.status_poll_interval_ms);
        self.predictions_fetch_limit = self
            .predictions_fetch_limit
            .filter(|limit| *limit > 0)
            .map(|limit| limit.min(MAX_PREDICTIONS_FETCH_LIMIT));
        self.run_defaults = self.run_defaults.normalized();
        self.views = self.views.normalized();
        self
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

/// How the uploaded CSV's header row is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvMode {
    /// Let the job sniff for a header.
    #[default]
    Auto,
    Header,
    Headerless,
}

impl CsvMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Header => "header",
            Self::Headerless => "headerless",
        }
    }
}

/// Run form defaults. `output_csv` doubles as the "unchanged" marker: a
/// submission only sends `output_csv` when it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default)]
    pub csv_mode: CsvMode,
    #[serde(default = "default_output_csv")]
    pub output_csv: String,
    #[serde(default = "default_text_col")]
    pub text_col: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_max_len")]
    pub max_len: u32,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            csv_mode: CsvMode::default(),
            output_csv: default_output_csv(),
            text_col: default_text_col(),
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            max_len: default_max_len(),
        }
    }
}

impl RunDefaults {
    fn normalized(mut self) -> Self {
        self.output_csv = self.output_csv.trim().to_string();
        if self.output_csv.is_empty() {
            self.output_csv = default_output_csv();
        }
        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }
        if self.max_len == 0 {
            self.max_len = default_max_len();
        }
        self
    }
}

/// Row limits for the recent-runs, predictions and summary tables (`0` = all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: Option<usize>,
    #[serde(default = "default_predictions_limit")]
    pub predictions_limit: Option<usize>,
    #[serde(default = "default_summary_limit")]
    pub summary_limit: Option<usize>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            predictions_limit: default_predictions_limit(),
            summary_limit: default_summary_limit(),
        }
    }
}

impl ViewSettings {
    fn normalized(self) -> Self {
        Self {
            recent_limit: self.recent_limit.filter(|limit| *limit > 0),
            predictions_limit: self.predictions_limit.filter(|limit| *limit > 0),
            summary_limit: self.summary_limit.filter(|limit| *limit > 0),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No suitable config directory could be resolved.
    #[error("No suitable config directory available")]
    NoConfigDir,
    /// Failed to create the config directory.
    #[error("Failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the config file.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config file is not valid TOML for [`DashboardSettings`].
    #[error("Invalid config TOML at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// `base_url` is not an absolute URL.
    #[error("Invalid base_url '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
}
