mod support;

use runboard::config::{self, CsvMode, DEFAULT_BASE_URL};
use support::runboard_env::RunboardEnvGuard;
use tempfile::tempdir;

#[test]
fn missing_config_file_yields_defaults_under_config_home() {
    let dir = tempdir().unwrap();
    let _guard = RunboardEnvGuard::set_config_home(dir.path());
    let settings = config::load_or_default().unwrap();
    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    assert_eq!(
        config::config_path().unwrap(),
        dir.path().join(".runboard").join("config.toml")
    );
    assert!(dir.path().join(".runboard").is_dir());
}

#[test]
fn config_file_and_env_override_are_applied() {
    let dir = tempdir().unwrap();
    let mut guard = RunboardEnvGuard::set_config_home(dir.path());
    let app_dir = dir.path().join(".runboard");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(
        app_dir.join("config.toml"),
        r#"
base_url = "http://files.example:9000/"
status_poll_interval_ms = 5000

[run_defaults]
csv_mode = "headerless"
batch_size = 8
"#,
    )
    .unwrap();

    let settings = config::load_or_default().unwrap();
    assert_eq!(settings.base_url, "http://files.example:9000");
    assert_eq!(settings.status_poll_interval_ms, 5000);
    assert_eq!(settings.run_defaults.csv_mode, CsvMode::Headerless);
    assert_eq!(settings.run_defaults.batch_size, 8);

    guard.set("RUNBOARD_BASE_URL", "http://env.example:8000/");
    let settings = config::load_or_default().unwrap();
    assert_eq!(settings.base_url, "http://env.example:8000");
    assert_eq!(settings.status_poll_interval_ms, 5000);
}

#[test]
fn invalid_env_base_url_is_rejected() {
    let dir = tempdir().unwrap();
    let mut guard = RunboardEnvGuard::set_config_home(dir.path());
    guard.set("RUNBOARD_BASE_URL", "not a url");
    assert!(matches!(
        config::load_or_default(),
        Err(config::ConfigError::InvalidBaseUrl { .. })
    ));
}
