// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Response decoders.
//!
//! An [`Extractor`] reads a [`Response`] without consuming it, so the same
//! response can be decoded again. [`FromResponse`] picks the extractor for a
//! declared return type.

use std::fs::OpenOptions;
use std::io::{self, BufWriter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::body::{Body, ReusableBody};
use crate::error::{Error, Result};
use crate::helpers::headers::{content_disposition_filename, content_type_charset};
use crate::message::Response;

pub trait Extractor<T>: Send + Sync {
    fn extract(&self, response: &Response) -> Result<T>;
}

/// JSON payload marker, used both for arguments and return types.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn read_all(response: &Response) -> Result<Vec<u8>> {
    response
        .body
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| Error::decode("cannot read response body", e))
}

/// Text decoded with the `Content-Type` charset, UTF-8 when none is declared.
pub struct StringExtractor;

impl Extractor<String> for StringExtractor {
    fn extract(&self, response: &Response) -> Result<String> {
        let charset = response
            .content_type()
            .and_then(content_type_charset)
            .unwrap_or_else(|| "utf-8".to_string());
        let bytes = read_all(response)?;
        decode_text(&charset, bytes)
    }
}

fn decode_text(charset: &str, bytes: Vec<u8>) -> Result<String> {
    match charset {
        "utf-8" | "utf8" => {
            String::from_utf8(bytes).map_err(|e| Error::decode("response is not valid UTF-8", e))
        }
        "iso-8859-1" | "latin1" | "latin-1" => Ok(bytes.iter().map(|&b| b as char).collect()),
        "us-ascii" | "ascii" => {
            if bytes.is_ascii() {
                Ok(bytes.iter().map(|&b| b as char).collect())
            } else {
                Err(Error::Decode {
                    message: "response is not valid US-ASCII".to_string(),
                    source: None,
                })
            }
        }
        other => Err(Error::Decode {
            message: format!("unsupported charset '{}'", other),
            source: None,
        }),
    }
}

pub struct JsonExtractor<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonExtractor<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonExtractor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Extractor<T> for JsonExtractor<T> {
    fn extract(&self, response: &Response) -> Result<T> {
        let reader = response
            .body
            .open()
            .map_err(|e| Error::decode("cannot read response body", e))?;
        serde_json::from_reader(reader).map_err(|e| Error::decode("invalid JSON response", e))
    }
}

/// Streams the body into a file under `dir`.
///
/// The file name comes from the caller, then from `Content-Disposition`,
/// then a generated `download-<uuid>` name.
pub struct FileExtractor {
    dir: PathBuf,
    name: Option<String>,
}

impl FileExtractor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn target(&self, response: &Response) -> PathBuf {
        if let Some(name) = &self.name {
            return self.dir.join(name);
        }
        let from_header = response
            .header(hyper::header::CONTENT_DISPOSITION.as_str())
            .and_then(content_disposition_filename)
            .and_then(|n| safe_file_name(&n));
        let name = from_header.unwrap_or_else(|| format!("download-{}", Uuid::new_v4()));
        self.dir.join(name)
    }
}

/// Last path component of a server-provided name, rejecting `.` and `..`.
fn safe_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

impl Extractor<PathBuf> for FileExtractor {
    fn extract(&self, response: &Response) -> Result<PathBuf> {
        let path = self.target(response);
        write_file(&path, &response.body).map_err(|e| {
            Error::decode(format!("cannot write response to {}", path.display()), e)
        })?;
        tracing::debug!(path = %path.display(), bytes = response.body.len(), "response saved");
        Ok(path)
    }
}

fn write_file(path: &Path, body: &ReusableBody) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    io::copy(&mut body.open()?, &mut writer)?;
    io::Write::flush(&mut writer)
}

/// Return types a client method may declare.
pub trait FromResponse: Sized {
    fn from_response(response: Response) -> Result<Self>;
}

impl FromResponse for Response {
    fn from_response(response: Response) -> Result<Self> {
        Ok(response)
    }
}

impl FromResponse for ReusableBody {
    fn from_response(response: Response) -> Result<Self> {
        Ok(response.body)
    }
}

impl FromResponse for () {
    fn from_response(response: Response) -> Result<Self> {
        if let Err(e) = response.body.close() {
            tracing::warn!(error = %e, "failed to release discarded response body");
        }
        Ok(())
    }
}

impl FromResponse for String {
    fn from_response(response: Response) -> Result<Self> {
        StringExtractor.extract(&response)
    }
}

impl<T: DeserializeOwned> FromResponse for Json<T> {
    fn from_response(response: Response) -> Result<Self> {
        JsonExtractor::new().extract(&response).map(Json)
    }
}

impl FromResponse for serde_json::Value {
    fn from_response(response: Response) -> Result<Self> {
        JsonExtractor::new().extract(&response)
    }
}

impl FromResponse for PathBuf {
    fn from_response(response: Response) -> Result<Self> {
        FileExtractor::new(std::env::temp_dir()).extract(&response)
    }
}
