// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! `multipart/form-data` bodies assembled by the part resolver.
//!
//! Parts are streamed by chaining readers; nothing is buffered beyond the
//! per-part header lines.

use std::fmt;
use std::io::{self, Cursor, Read};

use uuid::Uuid;

use super::{describe_length, Body, BodyReader, ReusableBody};

pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub body: Box<dyn Body>,
}

impl Part {
    pub fn new(name: impl Into<String>, body: impl Body + 'static) -> Self {
        Self {
            name: name.into(),
            filename: None,
            body: Box::new(body),
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self::new(
            name,
            ReusableBody::from_bytes(Some("text/plain; charset=utf-8".into()), value),
        )
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    fn header_block(&self, boundary: &str) -> String {
        let mut out = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"",
            boundary,
            escape_quoted(&self.name)
        );
        if let Some(filename) = &self.filename {
            out.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
        }
        out.push_str("\r\n");
        if let Some(ct) = self.body.content_type() {
            out.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        out.push_str("\r\n");
        out
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("body", &self.body.description())
            .finish()
    }
}

pub struct MultipartBody {
    boundary: String,
    content_type: String,
    parts: Vec<Part>,
}

impl MultipartBody {
    pub fn new(parts: Vec<Part>) -> Self {
        let boundary = format!("----http-interface-{}", Uuid::new_v4().simple());
        Self {
            content_type: format!("multipart/form-data; boundary={}", boundary),
            boundary,
            parts,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    fn closing(&self) -> String {
        format!("--{}--\r\n", self.boundary)
    }
}

impl Body for MultipartBody {
    fn content_type(&self) -> Option<&str> {
        Some(&self.content_type)
    }

    fn content_length(&self) -> Option<u64> {
        let mut total = self.closing().len() as u64;
        for part in &self.parts {
            total += part.header_block(&self.boundary).len() as u64;
            total += part.body.content_length()?;
            total += 2;
        }
        Some(total)
    }

    fn open(&self) -> io::Result<BodyReader> {
        let mut reader: BodyReader = Box::new(io::empty());
        for part in &self.parts {
            let header = Cursor::new(part.header_block(&self.boundary).into_bytes());
            reader = Box::new(
                reader
                    .chain(header)
                    .chain(part.body.open()?)
                    .chain(Cursor::new(b"\r\n".to_vec())),
            );
        }
        Ok(Box::new(reader.chain(Cursor::new(self.closing().into_bytes()))))
    }

    fn description(&self) -> String {
        format!(
            "multipart ({} parts, {})",
            self.parts.len(),
            describe_length(self.content_length())
        )
    }

    fn close(&self) -> io::Result<()> {
        let mut first_err = None;
        for part in &self.parts {
            if let Err(e) = part.body.close() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
