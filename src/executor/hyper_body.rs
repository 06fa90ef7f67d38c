// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Glue between blocking [`Body`] readers and hyper's frame-based bodies,
//! shared by the pooled and per-connection executors.

use std::io::{self, Read, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::{Frame, SizeHint};
use hyper::header::CONTENT_TYPE;
use hyper::HeaderMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::body::{Body, BodyReader, ReusableBody, Spool};
use crate::error::BoxError;
use crate::helpers::headers::{declared_length, get_header_str};

const CHUNK_SIZE: usize = 16 * 1024;
const CHANNEL_DEPTH: usize = 4;

/// Outbound request body fed by a blocking reader task.
///
/// The channel is bounded, so at most a few chunks are buffered regardless of
/// the payload size.
pub(crate) struct OutboundBody {
    rx: Option<mpsc::Receiver<io::Result<Bytes>>>,
    length: Option<u64>,
}

impl OutboundBody {
    pub(crate) fn empty() -> Self {
        Self {
            rx: None,
            length: Some(0),
        }
    }

    /// Open `body` and start pumping it. Must run inside a tokio runtime.
    pub(crate) fn stream(body: &dyn Body) -> io::Result<Self> {
        let reader = body.open()?;
        let length = body.content_length();
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        tokio::task::spawn_blocking(move || pump(reader, tx));
        Ok(Self {
            rx: Some(rx),
            length,
        })
    }

    pub(crate) fn for_request(body: Option<&dyn Body>) -> io::Result<Self> {
        match body {
            Some(body) => Self::stream(body),
            None => Ok(Self::empty()),
        }
    }
}

fn pump(mut reader: BodyReader, tx: mpsc::Sender<io::Result<Bytes>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                sent += n as u64;
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    trace!(sent, "request body receiver dropped");
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }
    trace!(sent, "request body fully streamed");
}

impl hyper::body::Body for OutboundBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(None);
        };
        match rx.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
            Poll::Ready(Some(Err(e))) => {
                self.rx = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.rx = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.rx.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match (self.rx.is_some(), self.length) {
            (false, _) => SizeHint::with_exact(0),
            (true, Some(len)) => SizeHint::with_exact(len),
            (true, None) => SizeHint::default(),
        }
    }
}

/// Write a native response body into a reusable body, frame by frame.
pub(crate) async fn spool_incoming<B>(headers: &HeaderMap, mut body: B) -> io::Result<ReusableBody>
where
    B: hyper::body::Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    let content_type = get_header_str(headers, CONTENT_TYPE.as_str()).map(str::to_string);
    let mut spool = Spool::new(content_type, declared_length(headers))?;
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(io::Error::other)?;
        if let Ok(data) = frame.into_data() {
            spool.write_all(&data)?;
        }
    }
    spool.finish()
}
