//! Byte sources feeding the stream decoders

use crate::providers::{ProviderError, ProviderResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An open response body read chunk by chunk
#[async_trait]
pub trait ByteSource: Send {
    /// Next chunk, `None` once the body is exhausted
    async fn read(&mut self) -> Option<ProviderResult<Bytes>>;

    /// Release the underlying resource. Called at most once by the decoder.
    fn close(&mut self) {}
}

#[async_trait]
impl ByteSource for reqwest::Response {
    async fn read(&mut self) -> Option<ProviderResult<Bytes>> {
        self.chunk().await.map_err(ProviderError::from).transpose()
    }
}

/// In-memory source replaying pre-split chunks
///
/// Useful for recorded fixtures; it counts reads and releases so callers can
/// observe decoder behavior.
#[derive(Debug, Default)]
pub struct MemorySource {
    chunks: VecDeque<ProviderResult<Bytes>>,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MemorySource {
    /// Source yielding each chunk in order
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| Ok(c.into())).collect(),
            ..Default::default()
        }
    }

    /// Source yielding the whole text as a single chunk
    pub fn from_text(text: &str) -> Self {
        Self::new([Bytes::copy_from_slice(text.as_bytes())])
    }

    /// Queue an error after the current chunks
    pub fn with_error(mut self, error: ProviderError) -> Self {
        self.chunks.push_back(Err(error));
        self
    }

    /// Shared read counter
    pub fn reads(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }

    /// Shared release counter
    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read(&mut self) -> Option<ProviderResult<Bytes>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.chunks.pop_front()
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
