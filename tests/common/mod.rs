// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use http_interface::executor::{Executor, ExecutorKind, ExecutorOptions};
use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// A mock server driven by its own runtime, so tests stay synchronous like
/// the client API they exercise.
pub struct Harness {
    // Dropped before the runtime that drives it.
    pub server: MockServer,
    rt: Runtime,
}

impl Harness {
    pub fn start() -> anyhow::Result<Self> {
        init_tracing();
        let rt = Runtime::new()?;
        let server = rt.block_on(MockServer::start());
        Ok(Self { server, rt })
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn received(&self) -> Vec<wiremock::Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub const KINDS: [ExecutorKind; 3] = [
    ExecutorKind::Hyper,
    ExecutorKind::Conn,
    ExecutorKind::Reqwest,
];

pub fn executor(kind: ExecutorKind, options: ExecutorOptions) -> anyhow::Result<Arc<dyn Executor>> {
    Ok(kind.build(options)?)
}

pub fn all_executors() -> anyhow::Result<Vec<Arc<dyn Executor>>> {
    KINDS
        .iter()
        .map(|k| executor(*k, ExecutorOptions::default()))
        .collect()
}

pub fn short_timeouts() -> ExecutorOptions {
    ExecutorOptions {
        connect_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(300),
        tls: None,
    }
}
