// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Repeatable bodies backed by memory or a spool file.
//!
//! A source whose declared length is known and below [`MEMORY_THRESHOLD`] is
//! buffered in memory. Anything else (unknown length or at least the
//! threshold) goes to a uniquely named file in the temp directory. A memory
//! buffer that grows past the threshold because the source under-declared its
//! length overflows to a file as well.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::{Buf, Bytes};
use tracing::{trace, warn};
use uuid::Uuid;

use super::{describe_length, Body, BodyReader};

pub const MEMORY_THRESHOLD: u64 = 5 * 1024 * 1024;

const SPOOL_PREFIX: &str = "http-interface-";

enum Store {
    /// Emptied on close.
    Memory(Mutex<Option<Bytes>>),
    Spooled(PathBuf),
}

pub struct ReusableBody {
    content_type: Option<String>,
    length: u64,
    store: Store,
    closed: AtomicBool,
}

impl ReusableBody {
    /// Wrap bytes that are already in memory.
    pub fn from_bytes(content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_type,
            length: bytes.len() as u64,
            store: Store::Memory(Mutex::new(Some(bytes))),
            closed: AtomicBool::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::from_bytes(None, Bytes::new())
    }

    /// Drain a single-pass reader. `declared_length` decides memory vs spool.
    pub fn from_reader(
        content_type: Option<String>,
        declared_length: Option<u64>,
        mut reader: impl Read,
    ) -> io::Result<Self> {
        let mut spool = Spool::new(content_type, declared_length)?;
        io::copy(&mut reader, &mut spool)?;
        spool.finish()
    }

    /// Snapshot another body so it can be read repeatedly.
    pub fn snapshot(body: &dyn Body) -> io::Result<Self> {
        let reader = body.open()?;
        Self::from_reader(
            body.content_type().map(str::to_string),
            body.content_length(),
            reader,
        )
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self.store, Store::Spooled(_))
    }

    pub fn spool_path(&self) -> Option<&Path> {
        match &self.store {
            Store::Spooled(path) => Some(path),
            Store::Memory(_) => None,
        }
    }

    /// Read the whole payload into memory.
    pub fn bytes(&self) -> io::Result<Bytes> {
        match &self.store {
            Store::Memory(slot) => {
                self.ensure_open()?;
                buffered(slot)
            }
            Store::Spooled(_) => {
                let mut buf = Vec::with_capacity(self.length as usize);
                self.open()?.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::other("body already closed"));
        }
        Ok(())
    }
}

fn buffered(slot: &Mutex<Option<Bytes>>) -> io::Result<Bytes> {
    slot.lock()
        .map_err(|_| io::Error::other("body buffer lock poisoned"))?
        .clone()
        .ok_or_else(|| io::Error::other("body already closed"))
}

impl Body for ReusableBody {
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }

    fn open(&self) -> io::Result<BodyReader> {
        self.ensure_open()?;
        match &self.store {
            Store::Memory(slot) => Ok(Box::new(buffered(slot)?.reader())),
            Store::Spooled(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
        }
    }

    fn description(&self) -> String {
        let backing = match &self.store {
            Store::Memory(_) => "memory".to_string(),
            Store::Spooled(path) => format!("spooled to {}", path.display()),
        };
        format!(
            "reusable ({}, {}, {})",
            self.content_type.as_deref().unwrap_or("no content type"),
            describe_length(Some(self.length)),
            backing
        )
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match &self.store {
            Store::Memory(slot) => {
                if let Ok(mut bytes) = slot.lock() {
                    bytes.take();
                }
            }
            Store::Spooled(path) => match std::fs::remove_file(path) {
                Ok(()) => trace!(path = %path.display(), "removed spool file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }
}

impl Drop for ReusableBody {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to remove spool file");
        }
    }
}

impl std::fmt::Debug for ReusableBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

enum Sink {
    Memory(Vec<u8>),
    File { path: PathBuf, file: BufWriter<File> },
}

/// Incremental writer that produces a [`ReusableBody`].
///
/// Executors feed native response chunks into a spool as they arrive.
/// Dropping an unfinished spool removes its file.
pub struct Spool {
    content_type: Option<String>,
    written: u64,
    sink: Option<Sink>,
}

impl Spool {
    pub fn new(content_type: Option<String>, declared_length: Option<u64>) -> io::Result<Self> {
        let sink = match declared_length {
            Some(n) if n < MEMORY_THRESHOLD => Sink::Memory(Vec::with_capacity(n as usize)),
            _ => spool_file()?,
        };
        Ok(Self {
            content_type,
            written: 0,
            sink: Some(sink),
        })
    }

    pub fn finish(mut self) -> io::Result<ReusableBody> {
        let store = match self.sink.take() {
            Some(Sink::Memory(buf)) => Store::Memory(Mutex::new(Some(Bytes::from(buf)))),
            Some(Sink::File { path, file }) => {
                if let Err(e) = file.into_inner().map_err(|e| e.into_error()) {
                    remove_quietly(&path);
                    return Err(e);
                }
                Store::Spooled(path)
            }
            None => return Err(io::Error::other("spool already finished")),
        };
        Ok(ReusableBody {
            content_type: self.content_type.take(),
            length: self.written,
            store,
            closed: AtomicBool::new(false),
        })
    }
}

impl Write for Spool {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let overflow = matches!(
            &self.sink,
            Some(Sink::Memory(buf)) if (buf.len() + data.len()) as u64 >= MEMORY_THRESHOLD
        );
        if overflow {
            if let Some(Sink::Memory(buf)) = self.sink.take() {
                let mut file_sink = spool_file()?;
                if let Sink::File { file, .. } = &mut file_sink {
                    file.write_all(&buf)?;
                }
                self.sink = Some(file_sink);
            }
        }
        let n = match self.sink.as_mut() {
            Some(Sink::Memory(buf)) => {
                buf.extend_from_slice(data);
                data.len()
            }
            Some(Sink::File { file, .. }) => file.write(data)?,
            None => return Err(io::Error::other("spool already finished")),
        };
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(Sink::File { file, .. }) => file.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for Spool {
    fn drop(&mut self) {
        if let Some(Sink::File { path, file }) = self.sink.take() {
            drop(file);
            remove_quietly(&path);
        }
    }
}

fn spool_file() -> io::Result<Sink> {
    let path = std::env::temp_dir().join(format!("{}{}.body", SPOOL_PREFIX, Uuid::new_v4()));
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    trace!(path = %path.display(), "spooling body to disk");
    Ok(Sink::File {
        path,
        file: BufWriter::new(file),
    })
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove spool file");
        }
    }
}
