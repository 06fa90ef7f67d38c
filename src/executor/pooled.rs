// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Pooled backend on top of the hyper-util legacy client.

use std::time::{Duration, Instant};

use hyper::Uri;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use tokio::runtime::Runtime;
use tracing::debug;

use super::hyper_body::{spool_incoming, OutboundBody};
use super::{wire_headers, Executor, ExecutorOptions};
use crate::error::{Error, Result};
use crate::message::{Request, RequestHead, Response};

type HttpsClient = LegacyClient<HttpsConnector<HttpConnector>, OutboundBody>;

pub struct HyperExecutor {
    runtime: Runtime,
    client: HttpsClient,
    read_timeout: Duration,
}

impl HyperExecutor {
    pub fn new(options: ExecutorOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("http-interface-hyper")
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("cannot start hyper runtime: {}", e)))?;

        let mut http = HttpConnector::new();
        http.set_connect_timeout(Some(options.connect_timeout));
        http.enforce_http(false);

        let builder = HttpsConnectorBuilder::new();
        let builder = match options.tls {
            Some(tls) => builder.with_tls_config((*tls).clone()),
            None => builder
                .with_native_roots()
                .map_err(|e| Error::Config(format!("cannot load native roots: {}", e)))?,
        };
        let https = builder.https_or_http().enable_http1().wrap_connector(http);

        let client = {
            let _guard = runtime.enter();
            LegacyClient::builder(TokioExecutor::new()).build(https)
        };

        Ok(Self {
            runtime,
            client,
            read_timeout: options.read_timeout,
        })
    }

    async fn send(&self, head: &RequestHead, request: &Request) -> Result<Response> {
        let uri: Uri = request
            .url
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("invalid url '{}': {}", request.url, e)))?;
        let headers = wire_headers(request)?;
        let body = OutboundBody::for_request(request.body.as_deref())
            .map_err(|e| Error::transport(head.clone(), e))?;

        let mut native = hyper::Request::new(body);
        *native.method_mut() = request.method.clone();
        *native.uri_mut() = uri;
        *native.headers_mut() = headers;

        let exchange = async {
            let response = self.client.request(native).await.map_err(|e| {
                if e.is_connect() {
                    Error::timeout(head.clone(), e)
                } else {
                    Error::transport(head.clone(), e)
                }
            })?;
            let (parts, incoming) = response.into_parts();
            let body = spool_incoming(&parts.headers, incoming)
                .await
                .map_err(|e| Error::transport(head.clone(), e))?;
            Ok(Response::new(parts.status, parts.headers, body))
        };

        match tokio::time::timeout(self.read_timeout, exchange).await {
            Ok(result) => result,
            Err(elapsed) => Err(Error::timeout(head.clone(), elapsed)),
        }
    }
}

impl Executor for HyperExecutor {
    fn name(&self) -> &'static str {
        "hyper"
    }

    fn execute(&self, mut request: Request) -> Result<Response> {
        let head = request.head();
        let started = Instant::now();
        let result = self.runtime.block_on(self.send(&head, &request));
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
