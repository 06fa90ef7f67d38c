// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Hooks around executor calls.
//!
//! Interceptors run in registration order: `before` once the request is built,
//! `after` once a response arrived, `failed` when the executor returned an
//! error. An `after` error stops the remaining interceptors.

use std::io::Read;
use std::time::Duration;

use tracing::{error, info};

use crate::body::Body;
use crate::capture::{CaptureRecordBuilder, CaptureWriter};
use crate::error::{translate_status, Error, Result};
use crate::message::{Request, RequestHead, Response};

/// What an interceptor knows about a finished exchange.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub executor: &'static str,
    pub request: &'a RequestHead,
    pub elapsed: Duration,
}

pub trait Interceptor: Send + Sync {
    fn before(&self, _request: &mut Request) -> Result<()> {
        Ok(())
    }

    fn after(&self, _exchange: &Exchange<'_>, response: Response) -> Result<Response> {
        Ok(response)
    }

    fn failed(&self, _exchange: &Exchange<'_>, _error: &Error) {}
}

/// Turns 4xx and 5xx responses into errors.
pub struct StatusInterceptor;

impl Interceptor for StatusInterceptor {
    fn after(&self, exchange: &Exchange<'_>, response: Response) -> Result<Response> {
        translate_status(exchange.request.clone(), response)
    }
}

/// Logs every exchange with a bounded preview of the response body.
pub struct LoggingInterceptor {
    body_preview: usize,
}

impl LoggingInterceptor {
    pub fn new(body_preview: usize) -> Self {
        Self { body_preview }
    }

    fn preview(&self, response: &Response) -> String {
        if self.body_preview == 0 {
            return String::new();
        }
        let mut buf = Vec::with_capacity(self.body_preview.min(response.body.len() as usize));
        let read = response
            .body
            .open()
            .and_then(|r| r.take(self.body_preview as u64).read_to_end(&mut buf));
        match read {
            Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
            Err(e) => format!("<unreadable body: {}>", e),
        }
    }
}

impl Interceptor for LoggingInterceptor {
    fn before(&self, request: &mut Request) -> Result<()> {
        info!(
            method = %request.method,
            url = %request.url,
            body = request.body.as_ref().map(|b| b.description()),
            "sending request"
        );
        Ok(())
    }

    fn after(&self, exchange: &Exchange<'_>, response: Response) -> Result<Response> {
        info!(
            executor = exchange.executor,
            method = %exchange.request.method,
            url = %exchange.request.url,
            status = response.status.as_u16(),
            elapsed_ms = exchange.elapsed.as_millis() as u64,
            body_length = response.body.len(),
            preview = %self.preview(&response),
            "received response"
        );
        Ok(response)
    }

    fn failed(&self, exchange: &Exchange<'_>, error: &Error) {
        info!(
            executor = exchange.executor,
            method = %exchange.request.method,
            url = %exchange.request.url,
            elapsed_ms = exchange.elapsed.as_millis() as u64,
            error = %error,
            "request failed"
        );
    }
}

/// Appends one JSONL record per exchange. Write failures are logged, never raised.
pub struct CaptureInterceptor {
    writer: CaptureWriter,
}

impl CaptureInterceptor {
    pub fn new(writer: CaptureWriter) -> Self {
        Self { writer }
    }
}

impl Interceptor for CaptureInterceptor {
    fn after(&self, exchange: &Exchange<'_>, response: Response) -> Result<Response> {
        let head = exchange.request;
        let record =
            CaptureRecordBuilder::new(exchange.executor, &head.method, &head.url, &head.headers)
                .response(response.status.as_u16(), &response.headers, response.body.len())
                .duration_ms(exchange.elapsed.as_millis() as u64);
        if let Err(e) = self.writer.write_capture(record) {
            error!(path = %self.writer.path().display(), error = %e, "failed to write capture");
        }
        Ok(response)
    }

    fn failed(&self, exchange: &Exchange<'_>, failure: &Error) {
        let head = exchange.request;
        let record =
            CaptureRecordBuilder::new(exchange.executor, &head.method, &head.url, &head.headers)
                .duration_ms(exchange.elapsed.as_millis() as u64)
                .error(failure.to_string());
        if let Err(e) = self.writer.write_capture(record) {
            error!(path = %self.writer.path().display(), error = %e, "failed to write capture");
        }
    }
}
