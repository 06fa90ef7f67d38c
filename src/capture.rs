// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Exchange capture writing to JSONL format.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hyper::header::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::serde_helpers::headers_to_map;

#[derive(Clone)]
pub struct CaptureWriter {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl CaptureWriter {
    pub fn new<P: Into<PathBuf>>(path: P) -> anyhow::Result<Self> {
        let path: PathBuf = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line.
    pub fn write_capture(&self, builder: CaptureRecordBuilder<'_>) -> anyhow::Result<()> {
        let record = builder.build();
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("capture file lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Load capture records from a JSONL file.
///
/// Malformed lines are skipped with a warning. A missing file yields no records.
pub fn load_captures<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<CaptureRecord>> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path_ref)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CaptureRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    line = idx + 1,
                    error = %e,
                    "failed to parse capture record, skipping"
                );
            }
        }
    }
    Ok(records)
}

/// Builder for capture records; id and timestamp are filled in on write.
pub struct CaptureRecordBuilder<'a> {
    executor: &'a str,
    method: &'a str,
    url: &'a str,
    status: Option<u16>,
    request_headers: &'a HeaderMap,
    response_headers: Option<&'a HeaderMap>,
    response_body_length: Option<u64>,
    duration_ms: u64,
    error: Option<String>,
}

impl<'a> CaptureRecordBuilder<'a> {
    pub fn new(
        executor: &'a str,
        method: &'a str,
        url: &'a str,
        request_headers: &'a HeaderMap,
    ) -> Self {
        Self {
            executor,
            method,
            url,
            status: None,
            request_headers,
            response_headers: None,
            response_body_length: None,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn response(mut self, status: u16, headers: &'a HeaderMap, body_length: u64) -> Self {
        self.status = Some(status);
        self.response_headers = Some(headers);
        self.response_body_length = Some(body_length);
        self
    }

    pub fn duration_ms(mut self, duration: u64) -> Self {
        self.duration_ms = duration;
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn build(self) -> CaptureRecord {
        CaptureRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            executor: self.executor.to_string(),
            method: self.method.to_string(),
            url: self.url.to_string(),
            status: self.status,
            duration_ms: self.duration_ms,
            request_headers: headers_to_map(self.request_headers),
            response_headers: self.response_headers.map(headers_to_map),
            response_body_length: self.response_body_length,
            error: self.error,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CaptureRecord {
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub executor: String,
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub request_headers: BTreeMap<String, Vec<String>>,
    pub response_headers: Option<BTreeMap<String, Vec<String>>>,
    pub response_body_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_headers_from_pairs;
    use serde_json::Value;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("http-interface_{}_{}.jsonl", tag, Uuid::new_v4()))
    }

    #[test]
    fn write_capture_writes_jsonl() -> anyhow::Result<()> {
        let tmp = temp_path("capture");
        let cw = CaptureWriter::new(&tmp)?;
        let req_headers = make_headers_from_pairs(&[("x-test", "1")]);
        let resp_headers = make_headers_from_pairs(&[("etag", "\"abc\"")]);

        cw.write_capture(
            CaptureRecordBuilder::new("hyper", "GET", "http://example/", &req_headers)
                .response(200, &resp_headers, 5)
                .duration_ms(10),
        )?;

        let s = std::fs::read_to_string(&tmp)?;
        let v: Value = serde_json::from_str(s.trim())?;
        assert_eq!(v["method"], "GET");
        assert_eq!(v["url"], "http://example/");
        assert_eq!(v["status"], 200);
        assert_eq!(v["response_body_length"], 5);
        assert_eq!(v["request_headers"]["x-test"][0], "1");
        assert!(v.get("error").is_none());

        std::fs::remove_file(&tmp)?;
        Ok(())
    }

    #[test]
    fn failed_exchanges_record_the_error() -> anyhow::Result<()> {
        let tmp = temp_path("failed");
        let cw = CaptureWriter::new(&tmp)?;
        let req_headers = HeaderMap::new();
        cw.write_capture(
            CaptureRecordBuilder::new("reqwest", "POST", "http://example/x", &req_headers)
                .error("connection refused"),
        )?;

        let records = load_captures(&tmp)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, None);
        assert_eq!(records[0].error.as_deref(), Some("connection refused"));

        std::fs::remove_file(&tmp)?;
        Ok(())
    }

    #[test]
    fn load_captures_skips_malformed_lines() -> anyhow::Result<()> {
        let tmp = temp_path("malformed");
        let content = r#"{"id":"1","timestamp":"2024-01-01T00:00:00Z","method":"GET","url":"http://example/","status":200,"duration_ms":0,"request_headers":{},"response_headers":null,"response_body_length":0}
invalid json line

{"id":"2","timestamp":"2024-01-01T00:00:01Z","executor":"conn","method":"POST","url":"http://example/post","status":201,"duration_ms":50,"request_headers":{"a":["1","2"]},"response_headers":null,"response_body_length":null}
"#;
        std::fs::write(&tmp, content)?;

        let records = load_captures(&tmp)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].executor, "");
        assert_eq!(records[1].request_headers["a"], vec!["1", "2"]);

        std::fs::remove_file(&tmp)?;
        Ok(())
    }

    #[test]
    fn load_captures_nonexistent_file_returns_empty() -> anyhow::Result<()> {
        assert!(load_captures(temp_path("missing"))?.is_empty());
        Ok(())
    }
}
