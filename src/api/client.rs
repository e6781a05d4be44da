//! `ureq` implementation of [`DashboardApi`].

use std::io::{BufRead, BufReader, Read};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::multipart::{self, RunForm};
use super::sse::SseDecoder;
use super::{ApiError, DashboardApi, LiveStream, StreamPoll};
use crate::http_client;
use crate::telemetry::{
    GroupSummary, ModelInfo, PredictionRow, RunRecord, RunStartResponse, RunStatus,
};

const MAX_RUNS_BYTES: usize = 16 * 1024 * 1024;
const MAX_PREDICTIONS_BYTES: usize = 16 * 1024 * 1024;
const MAX_SUMMARY_BYTES: usize = 4 * 1024 * 1024;
const MAX_SMALL_BYTES: usize = 1024 * 1024;

/// Talks to the dashboard service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    base_url: Url,
}

impl HttpDashboardApi {
    /// Build a client for the service rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut text = base_url.trim().to_string();
        if !text.ends_with('/') {
            text.push('/');
        }
        let base_url = Url::parse(&text)
            .map_err(|err| ApiError::Transport(format!("Invalid base URL '{base_url}': {err}")))?;
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| ApiError::Transport(format!("Invalid endpoint '{path}': {err}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &Url, max_bytes: usize) -> Result<T, ApiError> {
        tracing::trace!("GET {url}");
        let response = http_client::agent()
            .get(url.as_str())
            .set("Accept", "application/json")
            .call();
        decode_json(response, max_bytes)
    }
}

impl DashboardApi for HttpDashboardApi {
    fn fetch_runs(&self, query: &str) -> Result<Vec<RunRecord>, ApiError> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            runs: Vec<RunRecord>,
        }
        let url = self.endpoint("api/runs", &[("q", query)])?;
        let wire: Wire = self.get_json(&url, MAX_RUNS_BYTES)?;
        Ok(wire.runs)
    }

    fn fetch_run_status(&self) -> Result<RunStatus, ApiError> {
        let url = self.endpoint("api/run/status", &[])?;
        self.get_json(&url, MAX_SMALL_BYTES)
    }

    fn open_live_stream(&self) -> Result<Box<dyn LiveStream>, ApiError> {
        let url = self.endpoint("api/live/stream", &[])?;
        tracing::debug!("Opening live stream at {url}");
        let response = http_client::stream_agent()
            .get(url.as_str())
            .set("Accept", "text/event-stream")
            .call()
            .map_err(|err| map_call_error(err, MAX_SMALL_BYTES))?;
        Ok(Box::new(EventStream::new(response.into_reader())))
    }

    fn fetch_predictions(
        &self,
        path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<PredictionRow>, ApiError> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            rows: Vec<serde_json::Map<String, serde_json::Value>>,
        }
        let limit_text = limit.map(|limit| limit.to_string());
        let mut query = vec![("path", path)];
        if let Some(limit) = limit_text.as_deref() {
            query.push(("limit", limit));
        }
        let url = self.endpoint("api/predictions", &query)?;
        let wire: Wire = self.get_json(&url, MAX_PREDICTIONS_BYTES)?;
        Ok(wire.rows.into_iter().map(stringify_row).collect())
    }

    fn fetch_summary(&self, path: &str) -> Result<Option<GroupSummary>, ApiError> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            summary: Option<GroupSummary>,
        }
        let url = self.endpoint("api/summary", &[("path", path)])?;
        let wire: Wire = self.get_json(&url, MAX_SUMMARY_BYTES)?;
        Ok(wire.summary)
    }

    fn fetch_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            models: Vec<ModelInfo>,
        }
        let url = self.endpoint("api/models", &[])?;
        let wire: Wire = self.get_json(&url, MAX_SMALL_BYTES)?;
        Ok(wire.models)
    }

    fn start_run(&self, form: &RunForm) -> Result<RunStartResponse, ApiError> {
        let url = self.endpoint("api/run", &[])?;
        let boundary = multipart::new_boundary();
        let body = form.encode(&boundary).map_err(|err| {
            ApiError::Io(format!(
                "Failed to read upload {}: {err}",
                form.file_path.display()
            ))
        })?;
        tracing::info!(
            "Submitting run for {} ({} bytes)",
            form.file_path.display(),
            body.len()
        );
        let response = http_client::agent()
            .post(url.as_str())
            .set("Accept", "application/json")
            .set("Content-Type", &multipart::content_type(&boundary))
            .send_bytes(&body);
        decode_json(response, MAX_SMALL_BYTES)
    }

    fn cancel_run(&self) -> Result<(), ApiError> {
        let url = self.endpoint("api/run/cancel", &[])?;
        http_client::agent()
            .post(url.as_str())
            .call()
            .map(|_| ())
            .map_err(|err| map_call_error(err, MAX_SMALL_BYTES))
    }
}

fn decode_json<T: DeserializeOwned>(
    response: Result<ureq::Response, ureq::Error>,
    max_bytes: usize,
) -> Result<T, ApiError> {
    let response = response.map_err(|err| map_call_error(err, max_bytes))?;
    let body = http_client::read_response_text(response, max_bytes)
        .map_err(|err| ApiError::Io(err.to_string()))?;
    serde_json::from_str(&body).map_err(|err| ApiError::Json(err.to_string()))
}

fn map_call_error(error: ureq::Error, max_bytes: usize) -> ApiError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = http_client::read_response_text(response, max_bytes).unwrap_or_default();
            ApiError::Status {
                code,
                server_error: parse_server_error(&body),
            }
        }
        ureq::Error::Transport(err) => ApiError::Transport(err.to_string()),
    }
}

/// Pull the `error` message out of an error body, if it has one.
fn parse_server_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Wire {
        error: Option<String>,
    }
    serde_json::from_str::<Wire>(body.trim())
        .ok()
        .and_then(|wire| wire.error)
}

fn stringify_row(row: serde_json::Map<String, serde_json::Value>) -> PredictionRow {
    row.into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(text) => text,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

/// Line-oriented reader over a `text/event-stream` response body.
struct EventStream<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    decoder: SseDecoder,
}

impl<R: Read> EventStream<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            pending: Vec::new(),
            decoder: SseDecoder::default(),
        }
    }

    fn next_poll(&mut self) -> Result<StreamPoll, ApiError> {
        loop {
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => return Ok(StreamPoll::Closed),
                Ok(_) => {
                    if self.pending.last() != Some(&b'\n') {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    if let Some(payload) = self.decoder.push_line(&line) {
                        return Ok(StreamPoll::Message(payload));
                    }
                }
                Err(err) if http_client::is_idle_timeout(&err) => return Ok(StreamPoll::Idle),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(ApiError::Io(err.to_string())),
            }
        }
    }
}

impl<R: Read + Send> LiveStream for EventStream<R> {
    fn poll_message(&mut self) -> Result<StreamPoll, ApiError> {
        self.next_poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn endpoints_respect_base_path() {
        let api = HttpDashboardApi::new("http://127.0.0.1:8000/dash").unwrap();
        let url = api.endpoint("api/runs", &[("q", "batch 32&x")]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/dash/api/runs?q=batch+32%26x"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpDashboardApi::new("not a url").is_err());
    }

    #[test]
    fn server_error_field_is_extracted() {
        assert_eq!(
            parse_server_error(r#"{"error": "Run already in progress"}"#).as_deref(),
            Some("Run already in progress")
        );
        assert_eq!(parse_server_error("<html>oops</html>"), None);
        assert_eq!(parse_server_error(r#"{"detail": []}"#), None);
    }

    #[test]
    fn prediction_values_are_stringified() {
        let row: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(r#"{ "score": 0.5, "label": "NEGATIVE", "id": null }"#).unwrap();
        let row = stringify_row(row);
        assert_eq!(row["score"], "0.5");
        assert_eq!(row["label"], "NEGATIVE");
        assert_eq!(row["id"], "");
        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["score", "label", "id"]);
    }

    #[test]
    fn event_stream_yields_messages_then_closed() {
        let body = "data: {\"live\": null}\n\n: ping\n\ndata: {\"live\": {}}\n\n";
        let mut stream = EventStream::new(Cursor::new(body.as_bytes().to_vec()));
        assert_eq!(
            stream.poll_message().unwrap(),
            StreamPoll::Message("{\"live\": null}".to_string())
        );
        assert_eq!(
            stream.poll_message().unwrap(),
            StreamPoll::Message("{\"live\": {}}".to_string())
        );
        assert_eq!(stream.poll_message().unwrap(), StreamPoll::Closed);
    }

    /// Yields its chunks in order, reporting a read timeout between them.
    struct StutteringReader {
        chunks: Vec<&'static [u8]>,
        timed_out: bool,
    }

    impl Read for StutteringReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.timed_out && !self.chunks.is_empty() {
                self.timed_out = true;
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            self.timed_out = false;
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn read_timeouts_are_idle_ticks_and_keep_partial_lines() {
        let reader = StutteringReader {
            chunks: vec![b"data: par", b"tial\n\n"],
            timed_out: false,
        };
        let mut stream = EventStream::new(reader);
        assert_eq!(stream.poll_message().unwrap(), StreamPoll::Idle);
        assert_eq!(stream.poll_message().unwrap(), StreamPoll::Idle);
        assert_eq!(
            stream.poll_message().unwrap(),
            StreamPoll::Message("partial".to_string())
        );
        assert_eq!(stream.poll_message().unwrap(), StreamPoll::Closed);
    }
}
