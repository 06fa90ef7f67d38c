// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Payload abstraction shared by requests and responses.
//!
//! Network streams are single pass, but a payload often has to be read twice:
//! once for diagnostics and once by the caller. [`ReusableBody`] makes any
//! source repeatable, [`InputStreamBody`] wraps a live stream as is and
//! [`CompressedBody`] re-encodes a delegate on every read.

use std::fmt;
use std::io::{self, Read};
use std::sync::Mutex;

pub mod compressed;
pub mod multipart;
pub mod reusable;

pub use compressed::{CompressedBody, Encoding};
pub use multipart::{MultipartBody, Part};
pub use reusable::{ReusableBody, Spool, MEMORY_THRESHOLD};

/// Reader handed out by [`Body::open`]. Owns its data so it can be moved to
/// the thread that streams it onto the wire.
pub type BodyReader = Box<dyn Read + Send>;

pub trait Body: Send + Sync {
    fn content_type(&self) -> Option<&str>;

    /// Declared length in bytes; `None` when unknown.
    fn content_length(&self) -> Option<u64>;

    /// Open a reader over the payload.
    fn open(&self) -> io::Result<BodyReader>;

    fn description(&self) -> String;

    /// Release backing resources. Must be idempotent.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Thin wrapper around a live, single-pass stream.
pub struct InputStreamBody {
    content_type: Option<String>,
    content_length: Option<u64>,
    stream: Mutex<Option<BodyReader>>,
}

impl InputStreamBody {
    pub fn new(
        content_type: Option<String>,
        content_length: Option<u64>,
        stream: impl Read + Send + 'static,
    ) -> Self {
        Self {
            content_type,
            content_length,
            stream: Mutex::new(Some(Box::new(stream))),
        }
    }
}

impl Body for InputStreamBody {
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn open(&self) -> io::Result<BodyReader> {
        let mut slot = self
            .stream
            .lock()
            .map_err(|_| io::Error::other("input stream lock poisoned"))?;
        slot.take()
            .ok_or_else(|| io::Error::other("input stream already consumed"))
    }

    fn description(&self) -> String {
        format!(
            "stream ({}, {})",
            self.content_type.as_deref().unwrap_or("no content type"),
            describe_length(self.content_length)
        )
    }

    fn close(&self) -> io::Result<()> {
        if let Ok(mut slot) = self.stream.lock() {
            slot.take();
        }
        Ok(())
    }
}

pub(crate) fn describe_length(len: Option<u64>) -> String {
    match len {
        Some(n) => format!("{} bytes", n),
        None => "unknown length".to_string(),
    }
}
