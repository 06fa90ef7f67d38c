// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Shared test utilities to reduce duplication across test modules.

use std::io::Read;
use std::sync::Mutex;

use hyper::{HeaderMap, Method, StatusCode};

use crate::body::{Body, ReusableBody};
use crate::executor::Executor;
use crate::message::{Request, RequestHead, Response};

/// A `GET http://example.test/things` request head.
pub fn make_test_head() -> RequestHead {
    Request::new(Method::GET, "http://example.test/things").head()
}

pub fn make_headers_from_pairs(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (k, v) in pairs {
        let name = hyper::header::HeaderName::from_bytes(k.as_bytes()).expect("valid header name");
        headers.append(name, v.parse().expect("valid header value"));
    }
    headers
}

/// Response with an in-memory body typed after the `content-type` pair, if any.
pub fn make_test_response(status: StatusCode, headers: &[(&str, &str)], body: &[u8]) -> Response {
    let headers = make_headers_from_pairs(headers);
    let content_type = headers
        .get(hyper::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Response::new(
        status,
        headers,
        ReusableBody::from_bytes(content_type, body.to_vec()),
    )
}

/// Executor that records what it was asked to send and replies with a fixed response.
pub struct RecordingExecutor {
    status: StatusCode,
    reply: Vec<u8>,
    seen: Mutex<Vec<(RequestHead, Vec<u8>)>>,
}

impl RecordingExecutor {
    pub fn replying(status: StatusCode, reply: &str) -> Self {
        Self {
            status,
            reply: reply.as_bytes().to_vec(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RequestHead> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(|(h, _)| h.clone())
            .collect()
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.seen
            .lock()
            .expect("lock")
            .iter()
            .map(|(_, b)| b.clone())
            .collect()
    }
}

impl Executor for RecordingExecutor {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn execute(&self, mut request: Request) -> crate::Result<Response> {
        let head = request.head();
        let mut body = Vec::new();
        if let Some(b) = &request.body {
            b.open()
                .and_then(|mut r| r.read_to_end(&mut body))
                .map_err(|e| crate::Error::transport(head.clone(), e))?;
        }
        request.close();
        self.seen.lock().expect("lock").push((head, body));
        Ok(make_test_response(self.status, &[], &self.reply))
    }
}
