//! Server-sent event framing
//!
//! Only `data:` lines carry payloads; comments, `event:` and `id:` lines and
//! keep-alive blanks are skipped. A `[DONE]` payload ends the stream. Every
//! other payload goes to a backend-specific mapper.

use super::{Frame, FrameDecoder};
use crate::providers::ProviderResult;

/// Line prefix of a payload-carrying event field
pub const DATA_PREFIX: &str = "data:";

/// Payload that marks the end of an OpenAI-style stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// SSE decoder delegating payloads to `mapper`
pub struct SseDecoder<F> {
    mapper: F,
}

impl<F> SseDecoder<F>
where
    F: FnMut(&str) -> ProviderResult<Frame> + Send,
{
    pub fn new(mapper: F) -> Self {
        Self { mapper }
    }
}

impl<F> FrameDecoder for SseDecoder<F>
where
    F: FnMut(&str) -> ProviderResult<Frame> + Send,
{
    fn decode_line(&mut self, line: &str) -> ProviderResult<Frame> {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(Frame::Skip);
        };

        let payload = payload.trim();
        if payload.is_empty() {
            return Ok(Frame::Skip);
        }
        if payload == DONE_SENTINEL {
            return Ok(Frame::Done);
        }

        (self.mapper)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CompletionChunk;

    fn echo() -> SseDecoder<impl FnMut(&str) -> ProviderResult<Frame> + Send> {
        SseDecoder::new(|payload: &str| {
            Ok(Frame::Chunk(CompletionChunk::content("id", "m", payload)))
        })
    }

    #[test]
    fn test_non_data_lines_skipped() {
        let mut decoder = echo();
        assert_eq!(decoder.decode_line("").unwrap(), Frame::Skip);
        assert_eq!(decoder.decode_line(": keep-alive").unwrap(), Frame::Skip);
        assert_eq!(decoder.decode_line("event: ping").unwrap(), Frame::Skip);
        assert_eq!(decoder.decode_line("id: 7").unwrap(), Frame::Skip);
    }

    #[test]
    fn test_done_sentinel() {
        let mut decoder = echo();
        assert_eq!(decoder.decode_line("data: [DONE]").unwrap(), Frame::Done);
        assert_eq!(decoder.decode_line("data:[DONE]").unwrap(), Frame::Done);
    }

    #[test]
    fn test_payload_reaches_mapper() {
        let mut decoder = echo();
        match decoder.decode_line("data: {\"x\":1}").unwrap() {
            Frame::Chunk(chunk) => assert_eq!(chunk.text(), "{\"x\":1}"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
