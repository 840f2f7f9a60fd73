//! Pass-through response recording.
//!
//! # Responsibilities
//! - Forward every frame of the backend response to the client unchanged
//! - Keep a copy of status, headers and body for contract checks
//! - Hand the copy over once the body has been sent, or as far as it got
//!
//! # Design Decisions
//! - Each chunk is buffered before it is forwarded; a chunk that cannot be
//!   buffered is not forwarded either
//! - No size cap: the whole body is held in memory
//! - Validation reads the copy only, never the live stream

use std::collections::TryReserveError;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, StatusCode};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tokio::sync::oneshot;

/// Error raised when a chunk cannot be added to the buffer.
#[derive(Debug, thiserror::Error)]
#[error("failed to buffer response chunk of {len} bytes: {source}")]
pub struct RecordError {
    len: usize,
    #[source]
    source: TryReserveError,
}

/// Status, headers and body of one backend response.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// False when the body stream ended early (client gone, backend error).
    /// `body` then holds only what was forwarded.
    pub complete: bool,
}

/// Buffers what is written through it.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the response head.
    pub fn write_header(&mut self, status: StatusCode, headers: &HeaderMap) {
        self.status = status;
        self.headers = headers.clone();
    }

    /// Append a chunk. On error nothing is appended.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), RecordError> {
        self.body.try_reserve(chunk.len()).map_err(|source| RecordError {
            len: chunk.len(),
            source,
        })?;
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_captured(self, complete: bool) -> CapturedResponse {
        CapturedResponse {
            status: self.status,
            headers: self.headers,
            body: Bytes::from(self.body),
            complete,
        }
    }
}

/// Response body that records what it yields.
///
/// The capture is sent on the paired receiver exactly once: complete when
/// end-of-stream is reached (while polling, or on drop after the last frame,
/// since the server stops polling once `is_end_stream` is true), partial when
/// the stream fails or the body is dropped early, e.g. on client disconnect.
pub struct RecordingBody {
    inner: Body,
    recorder: ResponseRecorder,
    done: Option<oneshot::Sender<CapturedResponse>>,
}

impl RecordingBody {
    pub fn new(
        status: StatusCode,
        headers: &HeaderMap,
        inner: Body,
    ) -> (Self, oneshot::Receiver<CapturedResponse>) {
        let (tx, rx) = oneshot::channel();
        let mut recorder = ResponseRecorder::new();
        recorder.write_header(status, headers);

        (
            Self {
                inner,
                recorder,
                done: Some(tx),
            },
            rx,
        )
    }

    fn finish(&mut self, complete: bool) {
        if let Some(done) = self.done.take() {
            let recorder = std::mem::take(&mut self.recorder);
            // The receiver is gone only if the dispatcher stopped waiting.
            let _ = done.send(recorder.into_captured(complete));
        }
    }
}

impl HttpBody for RecordingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(chunk) = frame.data_ref() {
                    if let Err(e) = this.recorder.write(chunk) {
                        // Not forwarded; the capture ends before this chunk.
                        this.finish(false);
                        return Poll::Ready(Some(Err(axum::Error::new(e))));
                    }
                }
                if this.inner.is_end_stream() {
                    this.finish(true);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.finish(false);
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish(true);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for RecordingBody {
    fn drop(&mut self) {
        if self.done.is_some() {
            let complete = self.inner.is_end_stream();
            if !complete {
                tracing::debug!(
                    status = %self.recorder.status(),
                    buffered = self.recorder.body().len(),
                    "Response body dropped before completion"
                );
            }
            self.finish(complete);
        }
    }
}
