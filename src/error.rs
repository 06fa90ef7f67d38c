// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Failure taxonomy shared by every executor backend.
//!
//! Transport failures (`Timeout`, `Http` without a response) are raised by the
//! executors before any response exists. Status failures (`ClientStatus`,
//! `TooManyRequests`, `Http` with a response) are only produced by
//! [`translate_status`], which callers or interceptors opt into.

use std::time::Duration;

use hyper::StatusCode;
use thiserror::Error;

use crate::message::{RequestHead, Response};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Base failure: a server-series status or a generic I/O failure.
    #[error("{request} failed: {message}")]
    Http {
        request: RequestHead,
        response: Option<Box<Response>>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The call timed out or the connection could not be established.
    #[error("{request} timed out or could not connect: {source}")]
    Timeout {
        request: RequestHead,
        #[source]
        source: BoxError,
    },

    /// Any 4xx status other than 429.
    #[error("{request} returned client error {status}")]
    ClientStatus {
        request: RequestHead,
        response: Box<Response>,
        status: StatusCode,
    },

    /// 429 Too Many Requests.
    #[error("{request} was rate limited (429)")]
    TooManyRequests {
        request: RequestHead,
        response: Box<Response>,
        retry_after: Option<Duration>,
    },

    #[error("cannot encode argument '{param}': {message}")]
    Encode { param: String, message: String },

    #[error("cannot decode response: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no handler for {client}::{method}")]
    NoSuchMethod {
        client: &'static str,
        method: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn transport(request: RequestHead, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Http {
            request,
            response: None,
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn timeout(request: RequestHead, source: impl Into<BoxError>) -> Self {
        Self::Timeout {
            request,
            source: source.into(),
        }
    }

    pub fn decode(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn encode(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encode {
            param: param.into(),
            message: message.into(),
        }
    }

    /// The request that originated the failure, when the failure happened on the wire.
    pub fn request(&self) -> Option<&RequestHead> {
        match self {
            Self::Http { request, .. }
            | Self::Timeout { request, .. }
            | Self::ClientStatus { request, .. }
            | Self::TooManyRequests { request, .. } => Some(request),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Http { response, .. } => response.as_deref(),
            Self::ClientStatus { response, .. } | Self::TooManyRequests { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ClientStatus { status, .. } => Some(*status),
            Self::TooManyRequests { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Self::Http {
                response: Some(r), ..
            } => Some(r.status),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientStatus { .. } | Self::TooManyRequests { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Turn an error status into the matching error variant.
///
/// Statuses below 400 pass through untouched. The response body stays
/// readable either way because it is a reusable body.
pub fn translate_status(request: RequestHead, response: Response) -> Result<Response> {
    let status = response.status;
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .header(hyper::header::RETRY_AFTER.as_str())
            .and_then(|v| crate::http_date::parse_retry_after(v, chrono::Utc::now()));
        return Err(Error::TooManyRequests {
            request,
            response: Box::new(response),
            retry_after,
        });
    }
    if status.is_client_error() {
        return Err(Error::ClientStatus {
            request,
            response: Box::new(response),
            status,
        });
    }
    if status.is_server_error() {
        return Err(Error::Http {
            request,
            message: format!("server error {}", status),
            response: Some(Box::new(response)),
            source: None,
        });
    }
    Ok(response)
}
