// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! On-the-fly compressed bodies.
//!
//! Every [`Body::open`] re-reads the delegate and compresses it into a fresh
//! buffer. The compressed size is not known before compressing, so the length
//! is always reported as unknown.

use std::fmt;
use std::io::{self, Cursor, Write};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::Deserialize;

use super::{Body, BodyReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Gzip,
    /// HTTP `deflate`, i.e. a zlib stream.
    Deflate,
}

impl Encoding {
    /// The `Content-Encoding` token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }

    fn compress(&self, source: &mut dyn io::Read, level: Compression) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Gzip => {
                let mut enc = GzEncoder::new(Vec::new(), level);
                io::copy(source, &mut enc)?;
                enc.finish()
            }
            Encoding::Deflate => {
                let mut enc = ZlibEncoder::new(Vec::new(), level);
                io::copy(source, &mut enc)?;
                enc.flush()?;
                enc.finish()
            }
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct CompressedBody {
    delegate: Box<dyn Body>,
    encoding: Encoding,
    level: Compression,
}

impl CompressedBody {
    pub fn new(delegate: Box<dyn Body>, encoding: Encoding) -> Self {
        Self {
            delegate,
            encoding,
            level: Compression::default(),
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level);
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl Body for CompressedBody {
    fn content_type(&self) -> Option<&str> {
        self.delegate.content_type()
    }

    fn content_length(&self) -> Option<u64> {
        None
    }

    fn open(&self) -> io::Result<BodyReader> {
        let mut source = self.delegate.open()?;
        let compressed = self.encoding.compress(&mut source, self.level)?;
        Ok(Box::new(Cursor::new(compressed)))
    }

    fn description(&self) -> String {
        format!("{} ({})", self.delegate.description(), self.encoding)
    }

    fn close(&self) -> io::Result<()> {
        self.delegate.close()
    }
}
