//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only `data` fields matter to the dashboard; `event`, `id`, and `retry`
//! lines are accepted and ignored.

/// Accumulates `data:` lines until a blank line dispatches the event.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one line (with or without its terminator). Returns the event data
    /// when the line completes an event that carried any data.
    pub(crate) fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.data.clear();
            return Some(payload);
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}
