//! `multipart/form-data` encoding for job submissions.

use std::io;
use std::path::{Path, PathBuf};

/// Fields and upload path for a job submission, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunForm {
    /// CSV file uploaded under the `file` field.
    pub file_path: PathBuf,
    /// Text fields in submission order.
    pub fields: Vec<(String, String)>,
}

impl RunForm {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_string(), value.into()));
    }

    /// Value of the first field named `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Read the upload and encode the whole form with `boundary`.
    pub(crate) fn encode(&self, boundary: &str) -> io::Result<Vec<u8>> {
        let contents = std::fs::read(&self.file_path)?;
        let mut body = MultipartBody::new(boundary);
        body.file("file", &upload_name(&self.file_path), "text/csv", &contents);
        for (name, value) in &self.fields {
            body.text(name, value);
        }
        Ok(body.finish())
    }
}

/// Fresh random boundary for one request.
pub(crate) fn new_boundary() -> String {
    format!("runboard-{}", uuid::Uuid::new_v4().simple())
}

pub(crate) fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

struct MultipartBody<'a> {
    boundary: &'a str,
    bytes: Vec<u8>,
}

impl<'a> MultipartBody<'a> {
    fn new(boundary: &'a str) -> Self {
        Self {
            boundary,
            bytes: Vec::new(),
        }
    }

    fn text(&mut self, name: &str, value: &str) {
        self.open_part();
        self.line(&format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(name)
        ));
        self.line("");
        self.bytes.extend_from_slice(value.as_bytes());
        self.line("");
    }

    fn file(&mut self, name: &str, filename: &str, mime: &str, contents: &[u8]) {
        self.open_part();
        self.line(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            escape_quoted(name),
            escape_quoted(filename)
        ));
        self.line(&format!("Content-Type: {mime}"));
        self.line("");
        self.bytes.extend_from_slice(contents);
        self.line("");
    }

    fn finish(mut self) -> Vec<u8> {
        let closing = format!("--{}--", self.boundary);
        self.line(&closing);
        self.bytes
    }

    fn open_part(&mut self) {
        let delimiter = format!("--{}", self.boundary);
        self.line(&delimiter);
    }

    fn line(&mut self, text: &str) {
        self.bytes.extend_from_slice(text.as_bytes());
        self.bytes.extend_from_slice(b"\r\n");
    }
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.csv".to_string())
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
