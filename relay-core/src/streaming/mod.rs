//! Pull-based stream decoding
//!
//! A [`ChatStream`] owns an open response body and turns it into canonical
//! [`CompletionChunk`]s one pull at a time. The wire encoding is handled by a
//! [`FrameDecoder`]: server-sent events ([`sse`]), newline-delimited JSON
//! ([`ndjson`]) or event-typed JSON lines ([`event`]).
//!
//! Terminal outcomes are sticky. Once a stream reports end-of-stream or a
//! decode failure, every later pull returns the same outcome without touching
//! the body again. Releasing the body is idempotent and may race with an
//! in-flight pull from another task.

pub mod event;
pub mod lines;
pub mod ndjson;
pub mod source;
pub mod sse;

pub use lines::LineBuffer;
pub use source::{ByteSource, MemorySource};

use crate::protocol::CompletionChunk;
use crate::providers::{ProviderError, ProviderResult};
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Emit this chunk and keep reading
    Chunk(CompletionChunk),
    /// Emit this chunk; the next pull reports end-of-stream
    Final(CompletionChunk),
    /// Nothing to emit for this line
    Skip,
    /// Terminal marker, end-of-stream right away
    Done,
}

/// Turns single lines of a response body into frames
pub trait FrameDecoder: Send {
    fn decode_line(&mut self, line: &str) -> ProviderResult<Frame>;
}

#[derive(Debug, Clone)]
enum StreamState {
    /// Reading from the body
    Streaming,
    /// A final chunk was handed out, the next pull ends the stream
    Draining,
    Done,
    Failed(ProviderError),
}

/// Body shared between a stream and its closers
struct SharedSource {
    source: Mutex<Option<Box<dyn ByteSource>>>,
    closed: AtomicBool,
    closing: CancellationToken,
}

impl SharedSource {
    fn new(source: Box<dyn ByteSource>) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wake a pull blocked on the body so it drops the lock
        self.closing.cancel();
        if let Some(mut source) = self.source.lock().await.take() {
            source.close();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Handle that releases a stream's body from another task
#[derive(Clone)]
pub struct StreamCloser {
    shared: Arc<SharedSource>,
}

impl StreamCloser {
    /// Release the body. Only the first call across all handles has an effect.
    pub async fn close(&self) {
        self.shared.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl std::fmt::Debug for StreamCloser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCloser")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A lazily decoded stream of completion chunks
pub struct ChatStream {
    backend: String,
    shared: Arc<SharedSource>,
    lines: LineBuffer,
    decoder: Box<dyn FrameDecoder>,
    state: StreamState,
    cancel: CancellationToken,
}

impl ChatStream {
    pub fn new(
        backend: impl Into<String>,
        source: Box<dyn ByteSource>,
        decoder: Box<dyn FrameDecoder>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend: backend.into(),
            shared: Arc::new(SharedSource::new(source)),
            lines: LineBuffer::new(),
            decoder,
            state: StreamState::Streaming,
            cancel,
        }
    }

    /// Backend that produced this stream
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Pull the next chunk.
    ///
    /// Returns `Ok(None)` at end-of-stream. A cancelled token yields
    /// [`ProviderError::Cancelled`] before any read is attempted.
    pub async fn recv(&mut self) -> ProviderResult<Option<CompletionChunk>> {
        match &self.state {
            StreamState::Done => return Ok(None),
            StreamState::Failed(err) => return Err(err.clone()),
            StreamState::Draining => {
                self.finish().await;
                return Ok(None);
            }
            StreamState::Streaming => {}
        }

        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        loop {
            while let Some(line) = self.lines.next_line() {
                match self.decoder.decode_line(&line) {
                    Ok(Frame::Skip) => continue,
                    Ok(Frame::Chunk(chunk)) => return Ok(Some(chunk)),
                    Ok(Frame::Final(chunk)) => {
                        self.state = StreamState::Draining;
                        return Ok(Some(chunk));
                    }
                    Ok(Frame::Done) => {
                        self.finish().await;
                        return Ok(None);
                    }
                    Err(err) => return Err(self.fail(err).await),
                }
            }

            if self.lines.is_exhausted() {
                self.finish().await;
                return Ok(None);
            }

            if let Err(err) = self.fill().await {
                if err.is_cancelled() {
                    return Err(err);
                }
                return Err(self.fail(err).await);
            }
        }
    }

    /// Read one more chunk of the body into the line buffer
    async fn fill(&mut self) -> ProviderResult<()> {
        let mut guard = self.shared.source.lock().await;
        let Some(source) = guard.as_mut() else {
            self.lines.finish();
            return Ok(());
        };

        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProviderError::Cancelled),
            _ = self.shared.closing.cancelled() => None,
            next = source.read() => next,
        };

        match next {
            Some(Ok(bytes)) => self.lines.push(&bytes),
            Some(Err(err)) => return Err(err),
            None => self.lines.finish(),
        }
        Ok(())
    }

    async fn finish(&mut self) {
        debug!(backend = %self.backend, "stream finished");
        self.state = StreamState::Done;
        self.shared.close().await;
    }

    async fn fail(&mut self, err: ProviderError) -> ProviderError {
        warn!(backend = %self.backend, error = %err, "stream failed");
        self.state = StreamState::Failed(err.clone());
        self.shared.close().await;
        err
    }

    /// Release the body. Safe to call any number of times.
    pub async fn close(&self) {
        self.shared.close().await;
    }

    /// A handle that can release the body from another task
    pub fn closer(&self) -> StreamCloser {
        StreamCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drain the remaining chunks, concatenating their text
    pub async fn collect_text(&mut self) -> ProviderResult<String> {
        let mut text = String::new();
        while let Some(chunk) = self.recv().await? {
            text.push_str(&chunk.text());
        }
        Ok(text)
    }

    /// Adapt into a [`Stream`] that ends after the first error
    pub fn into_stream(self) -> impl Stream<Item = ProviderResult<CompletionChunk>> + Send {
        futures::stream::unfold(Some(self), |stream| async move {
            let mut stream = stream?;
            match stream.recv().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(stream))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("backend", &self.backend)
            .field("state", &self.state)
            .finish()
    }
}
