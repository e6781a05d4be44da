//! Library exports for the dashboard binary, benchmarks and tests.
/// Derived views over the run history.
pub mod aggregate;
/// HTTP client for the job service.
pub mod api;
/// Application directory resolution.
pub mod app_dirs;
/// User configuration.
pub mod config;
/// Session controller and background sources.
pub mod dashboard;
/// Shared HTTP agents.
pub mod http_client;
/// Logging setup.
pub mod logging;
/// Wire-level data model.
pub mod telemetry;
