// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! One HTTP/1.1 connection per exchange, driven through
//! `hyper::client::conn`. Nothing is pooled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::header::{HeaderValue, HOST};
use hyper::Uri;
use hyper_rustls::ConfigBuilderExt;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_rustls::TlsConnector;
use tracing::{debug, trace};
use url::{Host, Url};

use super::hyper_body::{spool_incoming, OutboundBody};
use super::{wire_headers, Executor, ExecutorOptions};
use crate::error::{BoxError, Error, Result};
use crate::message::{Request, RequestHead, Response};

pub struct ConnExecutor {
    runtime: Runtime,
    tls: TlsConnector,
    connect_timeout: Duration,
    read_timeout: Duration,
}

/// Where to connect and what to put on the request line.
struct Target {
    host: String,
    port: u16,
    tls: bool,
    authority: String,
    origin_form: Uri,
}

impl Target {
    fn parse(raw: &str) -> Result<Self> {
        let invalid =
            |msg: String| Error::InvalidRequest(format!("invalid url '{}': {}", raw, msg));
        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(invalid(format!("unsupported scheme '{}'", other))),
        };
        let host = match url.host() {
            Some(Host::Domain(d)) => d.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(invalid("missing host".to_string())),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port".to_string()))?;
        let host_str = url.host_str().unwrap_or(&host);
        let authority = match url.port() {
            Some(p) => format!("{}:{}", host_str, p),
            None => host_str.to_string(),
        };
        let path_and_query = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let origin_form = path_and_query
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| invalid(e.to_string()))?;
        Ok(Self {
            host,
            port,
            tls,
            authority,
            origin_form,
        })
    }
}

impl ConnExecutor {
    pub fn new(options: ExecutorOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("http-interface-conn")
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("cannot start connection runtime: {}", e)))?;

        let config = match options.tls {
            Some(tls) => tls,
            None => Arc::new(
                rustls::ClientConfig::builder()
                    .with_native_roots()
                    .map_err(|e| Error::Config(format!("cannot load native roots: {}", e)))?
                    .with_no_client_auth(),
            ),
        };

        Ok(Self {
            runtime,
            tls: TlsConnector::from(config),
            connect_timeout: options.connect_timeout,
            read_timeout: options.read_timeout,
        })
    }

    async fn connect(&self, head: &RequestHead, target: &Target) -> Result<TcpStream> {
        let connecting = TcpStream::connect((target.host.as_str(), target.port));
        match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(stream)
            }
            Ok(Err(e)) => Err(Error::timeout(head.clone(), e)),
            Err(elapsed) => Err(Error::timeout(head.clone(), elapsed)),
        }
    }

    async fn send(&self, head: &RequestHead, request: &Request) -> Result<Response> {
        let target = Target::parse(&request.url)?;
        let mut headers = wire_headers(request)?;
        if !headers.contains_key(HOST) {
            let host = HeaderValue::from_str(&target.authority)
                .map_err(|e| Error::InvalidRequest(format!("invalid host: {}", e)))?;
            headers.insert(HOST, host);
        }

        let tcp = self.connect(head, &target).await?;
        trace!(host = %target.host, port = target.port, tls = target.tls, "connected");

        let body = OutboundBody::for_request(request.body.as_deref())
            .map_err(|e| Error::transport(head.clone(), e))?;
        let mut native = hyper::Request::new(body);
        *native.method_mut() = request.method.clone();
        *native.uri_mut() = target.origin_form.clone();
        *native.headers_mut() = headers;

        let exchange = async {
            let sent = if target.tls {
                let name = ServerName::try_from(target.host.clone())
                    .map_err(|e| Error::InvalidRequest(format!("invalid server name: {}", e)))?;
                let stream = tokio::time::timeout(self.connect_timeout, self.tls.connect(name, tcp))
                    .await
                    .map_err(|e| Error::timeout(head.clone(), e))?
                    .map_err(|e| Error::timeout(head.clone(), e))?;
                exchange_over(stream, native).await
            } else {
                exchange_over(tcp, native).await
            };
            let response = sent.map_err(|e| Error::transport(head.clone(), e))?;

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

async fn exchange_over<S>(
    stream: S,
    request: hyper::Request<OutboundBody>,
) -> std::result::Result<hyper::Response<Incoming>, BoxError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) =
        hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!(error = %e, "connection closed with error");
        }
    });
    Ok(sender.send_request(request).await?)
}

impl Executor for ConnExecutor {
    fn name(&self) -> &'static str {
        "conn"
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
