// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Backend on `reqwest::blocking`, configured to neither follow redirects
//! nor decompress, like the hyper-based executors.

use std::io;
use std::time::Instant;

use hyper::header::CONTENT_TYPE;
use reqwest::blocking::{Body as WireBody, Client};
use reqwest::redirect::Policy;
use tracing::debug;

use super::{wire_headers, Executor, ExecutorOptions};
use crate::body::ReusableBody;
use crate::error::{Error, Result};
use crate::helpers::headers::{declared_length, get_header_str};
use crate::message::{Request, RequestHead, Response};

pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(options: ExecutorOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.read_timeout)
            .redirect(Policy::none());
        if let Some(tls) = options.tls {
            builder = builder.use_preconfigured_tls((*tls).clone());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build reqwest client: {}", e)))?;
        Ok(Self { client })
    }

    fn send(&self, head: &RequestHead, request: &Request) -> Result<Response> {
        let headers = wire_headers(request)?;
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(headers);

        if let Some(body) = &request.body {
            let reader = body.open().map_err(|e| Error::transport(head.clone(), e))?;
            builder = builder.body(match body.content_length() {
                Some(len) => WireBody::sized(reader, len),
                None => WireBody::new(reader),
            });
        }

        let native = builder.send().map_err(|e| map_error(head, e))?;
        let status = native.status();
        let headers = native.headers().clone();
        let content_type = get_header_str(&headers, CONTENT_TYPE.as_str()).map(str::to_string);
        let body = ReusableBody::from_reader(content_type, declared_length(&headers), native)
            .map_err(|e| map_read_error(head, e))?;
        Ok(Response::new(status, headers, body))
    }
}

fn map_error(head: &RequestHead, e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::timeout(head.clone(), e)
    } else {
        Error::transport(head.clone(), e)
    }
}

fn map_read_error(head: &RequestHead, e: io::Error) -> Error {
    let timed_out = e.kind() == io::ErrorKind::TimedOut
        || e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);
    if timed_out {
        Error::timeout(head.clone(), e)
    } else {
        Error::transport(head.clone(), e)
    }
}

impl Executor for ReqwestExecutor {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    fn execute(&self, mut request: Request) -> Result<Response> {
        let head = request.head();
        let started = Instant::now();
        let result = self.send(&head, &request);
        request.close();
        debug!(
            executor = self.name(),
            method = %head.method,
            url = %head.url,
            status = result.as_ref().map(|r| r.status.as_u16()).ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exchange finished"
        );
        result
    }
}
