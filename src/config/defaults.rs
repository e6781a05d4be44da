pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub(super) const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 2_000;
pub(super) const MIN_STATUS_POLL_INTERVAL_MS: u64 = 250;
/// Largest predictions limit the service accepts.
pub(super) const MAX_PREDICTIONS_FETCH_LIMIT: usize = 2_000;

pub(super) fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(super) fn default_status_poll_interval_ms() -> u64 {
    DEFAULT_STATUS_POLL_INTERVAL_MS
}

pub(super) fn default_predictions_fetch_limit() -> Option<usize> {
    Some(200)
}

pub(super) fn default_output_csv() -> String {
    "output/predictions.csv".to_string()
}

pub(super) fn default_text_col() -> String {
    "Text".to_string()
}

pub(super) fn default_model_name() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}

pub(super) fn default_batch_size() -> u32 {
    32
}

pub(super) fn default_max_len() -> u32 {
    256
}

pub(super) fn default_recent_limit() -> Option<usize> {
    Some(25)
}

pub(super) fn default_predictions_limit() -> Option<usize> {
    Some(25)
}

pub(super) fn default_summary_limit() -> Option<usize> {
    Some(10)
}

/// Clamp a poll interval: zero means "use the default", tiny values are raised.
pub(super) fn clamp_poll_interval_ms(value: u64) -> u64 {
    if value == 0 {
        DEFAULT_STATUS_POLL_INTERVAL_MS
    } else {
        value.max(MIN_STATUS_POLL_INTERVAL_MS)
    }
}
