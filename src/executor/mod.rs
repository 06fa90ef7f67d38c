// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Network backends.
//!
//! Every executor takes ownership of a [`Request`], sends it, and returns a
//! [`Response`] whose body is a [`crate::body::ReusableBody`]. The request is
//! closed on every exit path. Status codes are never interpreted here; only
//! transport failures become errors.
//!
//! The hyper-based executors own a tokio runtime and block on it, so they must
//! not be called (or dropped) from inside another runtime's async context.

use std::sync::Arc;
use std::time::Duration;

use hyper::header::{HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use hyper::HeaderMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::message::{Request, Response};

pub mod blocking;
pub mod conn;
mod hyper_body;
pub mod pooled;

pub use blocking::ReqwestExecutor;
pub use conn::ConnExecutor;
pub use pooled::HyperExecutor;

pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, request: Request) -> Result<Response>;
}

/// Settings fixed when an executor is built.
#[derive(Clone, Debug)]
pub struct ExecutorOptions {
    pub connect_timeout: Duration,
    /// Bounds the wait for response headers plus the whole body.
    pub read_timeout: Duration,
    /// Installed as given. Native roots are used when absent.
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            tls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Hyper,
    Conn,
    Reqwest,
}

impl ExecutorKind {
    pub fn build(self, options: ExecutorOptions) -> Result<Arc<dyn Executor>> {
        Ok(match self {
            ExecutorKind::Hyper => Arc::new(HyperExecutor::new(options)?),
            ExecutorKind::Conn => Arc::new(ConnExecutor::new(options)?),
            ExecutorKind::Reqwest => Arc::new(ReqwestExecutor::new(options)?),
        })
    }
}

/// Headers as they go on the wire: declared headers, a default `Accept`,
/// the cookie map, and body framing.
pub(crate) fn wire_headers(request: &Request) -> Result<HeaderMap> {
    let mut headers = request.headers.clone();

    if !headers.contains_key(ACCEPT) {
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    }

    if let Some(cookies) = request.cookie_header() {
        let mut values: Vec<String> = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        values.push(cookies);
        headers.insert(COOKIE, value(&values.join("; "))?);
    }

    match &request.body {
        Some(body) => {
            match body.content_length() {
                Some(len) => {
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
                }
                None => {
                    headers.remove(CONTENT_LENGTH);
                }
            }
            if !headers.contains_key(CONTENT_TYPE) {
                if let Some(ct) = body.content_type() {
                    headers.insert(CONTENT_TYPE, value(ct)?);
                }
            }
        }
        None => {
            headers.remove(CONTENT_LENGTH);
        }
    }

    Ok(headers)
}

fn value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v)
        .map_err(|e| Error::InvalidRequest(format!("invalid header value '{}': {}", v, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{CompressedBody, Encoding, ReusableBody};
    use hyper::Method;

    #[test]
    fn defaults_accept_and_merges_cookies() -> anyhow::Result<()> {
        let mut req = Request::new(Method::GET, "http://example.test/");
        req.headers.insert(COOKIE, "pre=0".parse()?);
        req.cookies.insert("b".into(), "2".into());
        req.cookies.insert("a".into(), "1".into());
        req.headers.insert(CONTENT_LENGTH, "99".parse()?);

        let h = wire_headers(&req)?;
        assert_eq!(h.get(ACCEPT).map(|v| v.as_bytes()), Some(&b"*/*"[..]));
        assert_eq!(h.get_all(COOKIE).iter().count(), 1);
        assert_eq!(h.get(COOKIE).map(|v| v.as_bytes()), Some(&b"pre=0; a=1; b=2"[..]));
        assert!(!h.contains_key(CONTENT_LENGTH));
        Ok(())
    }

    #[test]
    fn keeps_declared_accept() -> anyhow::Result<()> {
        let mut req = Request::new(Method::GET, "http://example.test/");
        req.headers.insert(ACCEPT, "application/json".parse()?);
        let h = wire_headers(&req)?;
        assert_eq!(h.get_all(ACCEPT).iter().count(), 1);
        assert_eq!(h.get(ACCEPT).map(|v| v.as_bytes()), Some(&b"application/json"[..]));
        Ok(())
    }

    #[test]
    fn body_framing_follows_known_length() -> anyhow::Result<()> {
        let body = ReusableBody::from_bytes(Some("text/plain".into()), "hello");
        let mut req = Request::new(Method::POST, "http://example.test/").with_body(body);
        req.headers.insert(CONTENT_LENGTH, "1".parse()?);
        let h = wire_headers(&req)?;
        assert_eq!(h.get(CONTENT_LENGTH).map(|v| v.as_bytes()), Some(&b"5"[..]));
        assert_eq!(h.get(CONTENT_TYPE).map(|v| v.as_bytes()), Some(&b"text/plain"[..]));
        Ok(())
    }

    #[test]
    fn unknown_length_strips_content_length() -> anyhow::Result<()> {
        let inner = ReusableBody::from_bytes(Some("text/plain".into()), "hello");
        let body = CompressedBody::new(Box::new(inner), Encoding::Gzip);
        let mut req = Request::new(Method::POST, "http://example.test/").with_body(body);
        req.headers.insert(CONTENT_LENGTH, "5".parse()?);
        let h = wire_headers(&req)?;
        assert!(!h.contains_key(CONTENT_LENGTH));
        Ok(())
    }

    #[test]
    fn executor_kind_deserializes_lowercase() -> anyhow::Result<()> {
        #[derive(Deserialize)]
        struct W {
            kind: ExecutorKind,
        }
        let w: W = toml::from_str("kind = \"reqwest\"")?;
        assert_eq!(w.kind, ExecutorKind::Reqwest);
        Ok(())
    }
}
