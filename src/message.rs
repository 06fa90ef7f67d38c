// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Backend-neutral request and response descriptors.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use hyper::{HeaderMap, Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::body::{Body, ReusableBody};

/// Request produced by the contract and consumed exactly once by an executor.
pub struct Request {
    pub method: Method,
    /// Absolute URL with the query string already encoded.
    pub url: String,
    pub headers: HeaderMap,
    pub cookies: BTreeMap<String, String>,
    /// Request attributes. Visible to interceptors and executors, never sent.
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub body: Option<Box<dyn Body>>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            cookies: BTreeMap::new(),
            attributes: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Body + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// Snapshot of everything but the body, attached to errors and logs.
    pub fn head(&self) -> RequestHead {
        RequestHead {
            method: self.method.to_string(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
        }
    }

    /// The cookie map as a single `Cookie` header value, in key order.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        Some(pairs.join("; "))
    }

    /// Release the body. Cleanup failures are logged and never returned, so a
    /// primary error on the calling path is never replaced.
    pub fn close(&mut self) {
        if let Some(body) = self.body.take() {
            if let Err(e) = body.close() {
                tracing::warn!(url = %self.url, error = %e, "failed to release request body");
            }
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("attributes", &self.attributes)
            .field("body", &self.body.as_ref().map(|b| b.description()))
            .finish()
    }
}

/// Serializable request snapshot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub url: String,
    #[serde(
        serialize_with = "crate::serde_helpers::serialize_headers",
        deserialize_with = "crate::serde_helpers::deserialize_headers"
    )]
    pub headers: HeaderMap,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl fmt::Display for RequestHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Response produced by an executor. The body can be read any number of times.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ReusableBody,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ReusableBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        crate::helpers::headers::get_header_str(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(hyper::header::CONTENT_TYPE.as_str())
    }

    pub fn bytes(&self) -> std::io::Result<Bytes> {
        self.body.bytes()
    }

    /// Body decoded with the charset declared by `Content-Type`.
    pub fn text(&self) -> crate::Result<String> {
        use crate::extract::{Extractor, StringExtractor};
        StringExtractor.extract(self)
    }
}
