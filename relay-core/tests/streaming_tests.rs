//! Integration tests for the streaming decoders

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use relay_core::protocol::FinishReason;
use relay_core::providers::anthropic::{map_stop_reason, streaming as anthropic_streaming};
use relay_core::providers::ollama::converter::from_ollama_stream_line;
use relay_core::providers::openai::streaming as openai_streaming;
use relay_core::streaming::event::EventDecoder;
use relay_core::streaming::ndjson::NdjsonDecoder;
use relay_core::streaming::{ByteSource, ChatStream, MemorySource};
use relay_core::{ProviderError, ProviderResult};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn openai_stream(source: MemorySource) -> ChatStream {
    ChatStream::new(
        "openai",
        Box::new(source),
        openai_streaming::decoder("openai"),
        CancellationToken::new(),
    )
}

fn ollama_stream(source: MemorySource) -> ChatStream {
    let decoder = NdjsonDecoder::new("ollama", |line: &Value| {
        from_ollama_stream_line("ollama", "chatcmpl-test", line)
    });
    ChatStream::new("ollama", Box::new(source), Box::new(decoder), CancellationToken::new())
}

fn event_stream(source: MemorySource) -> ChatStream {
    ChatStream::new(
        "bedrock",
        Box::new(source),
        Box::new(EventDecoder::new("bedrock", "anthropic.claude-3-haiku", map_stop_reason)),
        CancellationToken::new(),
    )
}

fn sse_line(content: &str) -> String {
    format!(
        "data: {{\"id\":\"c1\",\"model\":\"gpt-4o\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{}\"}}}}]}}\n\n",
        content
    )
}

#[tokio::test]
async fn test_sse_stops_at_done_sentinel() {
    let body = format!(
        "{}{}data: [DONE]\n\n{}",
        sse_line("Hello"),
        sse_line(", world"),
        sse_line("never seen")
    );
    let source = MemorySource::from_text(&body);
    let closes = source.closes();
    let mut stream = openai_stream(source);

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "Hello");
    assert_eq!(stream.recv().await.unwrap().unwrap().text(), ", world");
    for _ in 0..3 {
        assert!(stream.recv().await.unwrap().is_none());
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sse_split_at_arbitrary_boundaries() {
    let body = format!("{}{}data: [DONE]\n", sse_line("héllo"), sse_line("wörld"));
    let bytes = body.as_bytes();

    // Every split point, including the middle of multi-byte characters
    for split in 1..bytes.len() {
        let source = MemorySource::new([bytes[..split].to_vec(), bytes[split..].to_vec()]);
        let mut stream = openai_stream(source);
        assert_eq!(stream.collect_text().await.unwrap(), "héllowörld", "split at {}", split);
    }
}

#[tokio::test]
async fn test_sse_crlf_and_event_lines() {
    let body = "event: completion\r\ndata: {\"id\":\"c\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ok\"}}]}\r\n\r\n: keep-alive\r\ndata: [DONE]\r\n";
    let mut stream = openai_stream(MemorySource::from_text(body));
    assert_eq!(stream.collect_text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_sse_malformed_payload_is_sticky() {
    let body = format!("{}data: {{broken\n\n{}", sse_line("a"), sse_line("b"));
    let source = MemorySource::new([body]);
    let reads = source.reads();
    let mut stream = openai_stream(source);

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "a");
    let first = stream.recv().await.unwrap_err();
    assert!(matches!(first, ProviderError::Decode { .. }));

    let reads_after_failure = reads.load(Ordering::SeqCst);
    let second = stream.recv().await.unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(reads.load(Ordering::SeqCst), reads_after_failure);
}

#[tokio::test]
async fn test_anthropic_events_end_on_message_stop() {
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"model\":\"claude-3\",\"content\":[],\"usage\":{\"input_tokens\":5}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":1}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"late\"}}\n\n",
    );
    let mut stream = ChatStream::new(
        "anthropic",
        Box::new(MemorySource::from_text(body)),
        anthropic_streaming::decoder("anthropic", "claude-3"),
        CancellationToken::new(),
    );

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "Hi");
    let last = stream.recv().await.unwrap().unwrap();
    assert_eq!(last.finish_reason(), Some(FinishReason::Stop));
    assert_eq!(last.usage.map(|u| u.total_tokens), Some(6));
    assert!(stream.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn test_ndjson_done_then_end_of_stream() {
    let body = concat!(
        "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
        "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
        "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"prompt_eval_count\":4,\"eval_count\":2}\n",
    );
    let source = MemorySource::from_text(body);
    let closes = source.closes();
    let mut stream = ollama_stream(source);

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "Hel");
    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "lo");

    // The terminal chunk and end-of-stream arrive on separate pulls
    let terminal = stream.recv().await.unwrap().unwrap();
    assert_eq!(terminal.finish_reason(), Some(FinishReason::Stop));
    assert_eq!(terminal.usage.map(|u| u.prompt_tokens), Some(4));

    assert!(stream.recv().await.unwrap().is_none());
    assert!(stream.recv().await.unwrap().is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ndjson_length_reason_kept() {
    let body = "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"x\"},\"done\":true,\"done_reason\":\"length\"}";
    let mut stream = ollama_stream(MemorySource::from_text(body));

    let terminal = stream.recv().await.unwrap().unwrap();
    assert_eq!(terminal.text(), "x");
    assert_eq!(terminal.finish_reason(), Some(FinishReason::Length));
    assert!(stream.recv().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sse_error_event_fails_stream() {
    let body = format!(
        "{}data: {{\"error\":{{\"message\":\"server overloaded\",\"type\":\"server_error\"}}}}\n\n{}data: [DONE]\n\n",
        sse_line("Hi"),
        sse_line("never seen")
    );
    let source = MemorySource::from_text(&body);
    let closes = source.closes();
    let mut stream = openai_stream(source);

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "Hi");
    let first = stream.recv().await.unwrap_err();
    assert!(matches!(first, ProviderError::Decode { .. }), "{:?}", first);
    assert!(first.to_string().contains("server overloaded"), "{}", first);

    let second = stream.recv().await.unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ndjson_error_line_fails_stream() {
    let body = concat!(
        "{\"model\":\"llama3\",\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
        "{\"error\":\"model runner has unexpectedly stopped\"}\n",
    );
    let mut stream = ollama_stream(MemorySource::from_text(body));

    assert_eq!(stream.recv().await.unwrap().unwrap().text(), "Hi");
    let first = stream.recv().await.unwrap_err();
    assert!(matches!(first, ProviderError::Decode { .. }), "{:?}", first);
    assert!(first.to_string().contains("unexpectedly stopped"), "{}", first);
    assert_eq!(stream.recv().await.unwrap_err().to_string(), first.to_string());
}

#[tokio::test]
async fn test_event_stream_tolerates_unknown_events() {
    let body = concat!(
        "{\"type\":\"messageStart\",\"role\":\"assistant\"}\n",
        "{\"type\":\"contentBlockDelta\",\"delta\":{\"text\":\"Hel\"}}\n",
        "{\"type\":\"shinyNewEvent\",\"payload\":{\"x\":1}}\n",
        "{\"type\":\"contentBlockDelta\",\"delta\":{\"text\":\"lo\"}}\n",
        "{\"type\":\"contentBlockStop\"}\n",
        "{\"type\":\"messageStop\",\"messageStop\":{\"stopReason\":\"max_tokens\"}}\n",
        "{\"type\":\"metadata\",\"usage\":{\"inputTokens\":3,\"outputTokens\":2}}\n",
    );
    let chunks: Vec<_> = event_stream(MemorySource::from_text(body))
        .into_stream()
        .collect()
        .await;

    assert_eq!(chunks.len(), 3);
    let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
    assert_eq!(chunks[0].text(), "Hel");
    assert_eq!(chunks[1].text(), "lo");
    assert_eq!(chunks[2].finish_reason(), Some(FinishReason::Length));
}

#[tokio::test]
async fn test_cancelled_before_first_pull_does_not_read() {
    let source = MemorySource::from_text(&sse_line("hi"));
    let reads = source.reads();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut stream = ChatStream::new(
        "openai",
        Box::new(source),
        openai_streaming::decoder("openai"),
        cancel,
    );

    let err = stream.recv().await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_close_releases_once() {
    let source = MemorySource::from_text(&sse_line("hi"));
    let closes = source.closes();
    let stream = openai_stream(source);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let closer = stream.closer();
        handles.push(tokio::spawn(async move { closer.close().await }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    stream.close().await;

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(stream.closer().is_closed());
}

/// A body that never produces data until released
struct PendingSource {
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl ByteSource for PendingSource {
    async fn read(&mut self) -> Option<ProviderResult<Bytes>> {
        std::future::pending().await
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_close_unblocks_pending_pull() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut stream = ChatStream::new(
        "openai",
        Box::new(PendingSource {
            closes: Arc::clone(&closes),
        }),
        openai_streaming::decoder("openai"),
        CancellationToken::new(),
    );
    let closer = stream.closer();

    let pull = tokio::spawn(async move { stream.recv().await });
    tokio::task::yield_now().await;
    closer.close().await;

    let result = pull.await.unwrap();
    assert!(result.unwrap().is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_unblocks_pending_pull() {
    let cancel = CancellationToken::new();
    let mut stream = ChatStream::new(
        "openai",
        Box::new(PendingSource {
            closes: Arc::new(AtomicUsize::new(0)),
        }),
        openai_streaming::decoder("openai"),
        cancel.clone(),
    );

    let pull = tokio::spawn(async move { stream.recv().await });
    tokio::task::yield_now().await;
    cancel.cancel();

    assert!(pull.await.unwrap().unwrap_err().is_cancelled());
}

#[tokio::test]
async fn test_pending_pull_woken_by_cancel() {
    let cancel = CancellationToken::new();
    let mut stream = ChatStream::new(
        "openai",
        Box::new(PendingSource {
            closes: Arc::new(AtomicUsize::new(0)),
        }),
        openai_streaming::decoder("openai"),
        cancel.clone(),
    );

    let mut pull = tokio_test::task::spawn(stream.recv());
    tokio_test::assert_pending!(pull.poll());

    cancel.cancel();
    assert!(pull.is_woken());
    let err = tokio_test::assert_ready_err!(pull.poll());
    assert!(err.is_cancelled());
}
