// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Configuration loading.

use std::time::Duration;

use serde::Deserialize;

use crate::body::Encoding;
use crate::executor::{ExecutorKind, ExecutorOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Prefix for every request URL, e.g. http://localhost:8080
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub executor: ExecutorKind,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Compress outbound bodies with this encoding.
    #[serde(default)]
    pub compression: Option<Encoding>,

    /// Turn 4xx/5xx responses into errors.
    #[serde(default)]
    pub translate_status: bool,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            executor: ExecutorKind::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            compression: None,
            translate_status: false,
        }
    }
}

impl ClientConfig {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            tls: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// Maximum number of response body bytes logged per exchange.
    #[serde(default = "default_body_preview")]
    pub body_preview: usize,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_body_preview() -> usize {
    1024
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            body_preview: default_body_preview(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CaptureConfig {
    /// Path to append exchange records (JSONL). Capture is off when unset.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

impl Config {
    /// Load configuration from a TOML file:
    ///
    /// [client]
    /// base_url = "https://api.example.com"
    /// executor = "reqwest"
    ///
    /// [capture]
    /// path = "exchanges.jsonl"
    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.client.base_url).map_err(|e| {
            anyhow::anyhow!("client.base_url '{}' is invalid: {}", self.client.base_url, e)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!(
                "client.base_url must use http or https, got '{}'",
                url.scheme()
            );
        }
        if self.client.connect_timeout_ms == 0 {
            anyhow::bail!("client.connect_timeout_ms must be greater than zero");
        }
        if self.client.read_timeout_ms == 0 {
            anyhow::bail!("client.read_timeout_ms must be greater than zero");
        }
        Ok(())
    }
}
