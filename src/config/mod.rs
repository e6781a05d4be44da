//! Dashboard configuration stored as TOML under the `.runboard` directory.

mod defaults;
mod types;

use std::path::{Path, PathBuf};

pub use types::{ConfigError, CsvMode, DashboardSettings, RunDefaults, ViewSettings};
pub use defaults::DEFAULT_BASE_URL;

use crate::app_dirs;

/// Settings file name inside the `.runboard` directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "RUNBOARD_BASE_URL";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from disk, returning defaults when the file is missing.
///
/// `RUNBOARD_BASE_URL` wins over the file's `base_url`.
pub fn load_or_default() -> Result<DashboardSettings, ConfigError> {
    let path = config_path()?;
    let mut settings = load_settings_from(&path)?;
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        if !base_url.trim().is_empty() {
            settings.base_url = base_url;
        }
    }
    validated(settings.normalized())
}

/// Read settings from a specific file; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<DashboardSettings, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}; using defaults", path.display());
        return Ok(DashboardSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: DashboardSettings =
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
    validated(settings.normalized())
}

fn validated(settings: DashboardSettings) -> Result<DashboardSettings, ConfigError> {
    url::Url::parse(&settings.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
        value: settings.base_url.clone(),
        source,
    })?;
    Ok(settings)
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(settings, DashboardSettings::default());
        assert_eq!(settings.status_poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.run_defaults.batch_size, 32);
        assert_eq!(settings.run_defaults.max_len, 256);
        assert_eq!(settings.views.summary_limit, Some(10));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
base_url = "http://dash.local:9000/"
status_poll_interval_ms = 0

[run_defaults]
csv_mode = "headerless"
batch_size = 64

[views]
recent_limit = 0
"#,
        )
        .unwrap();
        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.base_url, "http://dash.local:9000");
        assert_eq!(settings.status_poll_interval_ms, 2_000);
        assert_eq!(settings.run_defaults.csv_mode, CsvMode::Headerless);
        assert_eq!(settings.run_defaults.batch_size, 64);
        assert_eq!(settings.run_defaults.max_len, 256);
        assert_eq!(settings.run_defaults.output_csv, "output/predictions.csv");
        assert_eq!(settings.views.recent_limit, None);
        assert_eq!(settings.views.predictions_limit, Some(25));
    }

    #[test]
    fn tiny_poll_interval_is_raised() {
        let settings = DashboardSettings {
            status_poll_interval_ms: 5,
            ..DashboardSettings::default()
        }
        .normalized();
        assert_eq!(settings.status_poll_interval_ms, 250);
    }

    #[test]
    fn predictions_fetch_limit_is_capped_at_service_maximum() {
        let capped = DashboardSettings {
            predictions_fetch_limit: Some(50_000),
            ..DashboardSettings::default()
        }
        .normalized();
        assert_eq!(capped.predictions_fetch_limit, Some(2_000));
        let kept = DashboardSettings {
            predictions_fetch_limit: Some(500),
            ..DashboardSettings::default()
        }
        .normalized();
        assert_eq!(kept.predictions_fetch_limit, Some(500));
        let disabled = DashboardSettings {
            predictions_fetch_limit: Some(0),
            ..DashboardSettings::default()
        }
        .normalized();
        assert_eq!(disabled.predictions_fetch_limit, None);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "base_url = [").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "base_url = \"dashboard\"").unwrap();
        let err = load_settings_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn config_path_lives_under_app_root() {
        let base = tempdir().unwrap();
        let _guard = app_dirs::OverrideGuard::set(base.path().to_path_buf());
        let path = config_path().unwrap();
        assert_eq!(
            path,
            base.path().join(app_dirs::APP_DIR_NAME).join(CONFIG_FILE_NAME)
        );
    }
}
