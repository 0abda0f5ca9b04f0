//! Pull-based fragment stream
//!
//! [`FragmentStream`] turns a raw byte stream into the assistant-visible text
//! fragments of one reply. It is an explicit state machine: every poll either
//! decodes a buffered document, waits for the next transport chunk, or has
//! already finished. A transport error ends the stream with one synthetic
//! `[Error: ...]` fragment; no error ever escapes as an `Err`.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;

use super::ByteStream;
use super::decoder::{DecodeOutcome, JsonStreamDecoder};
use crate::error::RelayError;

/// Where the fragment stream currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Buffer has no complete document; the next poll reads the transport
    AwaitingChunk,
    /// A chunk was appended; the buffer may hold complete documents
    HaveDocument,
    /// `done` was seen or the transport closed
    Done,
    /// A transport error was converted into the final fragment
    Errored,
}

impl StreamState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }
}

/// Lazy, finite, non-restartable sequence of reply fragments
pub struct FragmentStream {
    source: Option<ByteStream>,
    decoder: JsonStreamDecoder,
    state: StreamState,
    accumulated: String,
    fragments: usize,
    started: Instant,
    max_pending_bytes: Option<usize>,
    malformed_logged: bool,
    pending_error: Option<RelayError>,
    status_error: Option<RelayError>,
    error: Option<RelayError>,
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("state", &self.state)
            .field("fragments", &self.fragments)
            .field("pending_bytes", &self.decoder.pending_len())
            .field("max_pending_bytes", &self.max_pending_bytes)
            .field("error", &self.error)
            .finish()
    }
}

impl FragmentStream {
    /// Decode fragments from a raw byte stream
    pub fn new(source: ByteStream) -> Self {
        Self {
            source: Some(source),
            decoder: JsonStreamDecoder::new(),
            state: StreamState::AwaitingChunk,
            accumulated: String::new(),
            fragments: 0,
            started: Instant::now(),
            max_pending_bytes: None,
            malformed_logged: false,
            pending_error: None,
            status_error: None,
            error: None,
        }
    }

    /// A stream whose only element is the error fragment for `error`
    ///
    /// Used when the request fails before any body is available.
    pub fn failed(error: RelayError) -> Self {
        let empty = futures::stream::empty::<Result<Bytes, RelayError>>();
        let mut stream = Self::new(Box::pin(empty));
        stream.source = None;
        stream.pending_error = Some(error);
        stream
    }

    /// Give up with a stream error once this many bytes are pending without
    /// forming a complete document. Unlimited by default.
    pub fn with_max_pending_bytes(mut self, limit: usize) -> Self {
        self.max_pending_bytes = Some(limit);
        self
    }

    /// Error to report if the body ends without yielding any fragment
    ///
    /// Set for non-success response statuses; the body is still decoded.
    pub fn with_status_error(mut self, error: RelayError) -> Self {
        self.status_error = Some(error);
        self
    }

    /// Reset the elapsed-time origin used in log lines
    pub fn with_start(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Concatenation of every content fragment emitted so far
    ///
    /// The synthetic error fragment is not part of the running total.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn into_accumulated(self) -> String {
        self.accumulated
    }

    pub fn fragments_emitted(&self) -> usize {
        self.fragments
    }

    /// The error that ended the stream, if any
    pub fn error(&self) -> Option<&RelayError> {
        self.error.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Drain the stream and return every fragment concatenated, error
    /// fragment included
    pub async fn collect_response(mut self) -> String {
        let mut response = String::new();
        while let Some(fragment) = self.next().await {
            response.push_str(&fragment);
        }
        response
    }

    fn record(&mut self, content: String) -> String {
        self.accumulated.push_str(&content);
        self.fragments += 1;
        content
    }

    fn fail(&mut self, error: RelayError) -> String {
        tracing::error!(
            "Exception during streaming after {:.2}s: {}",
            self.elapsed().as_secs_f64(),
            error
        );
        let fragment = format!("[Error: {error}]");
        self.source = None;
        self.state = StreamState::Errored;
        self.error = Some(error);
        fragment
    }

    fn finish(&mut self) -> Option<String> {
        tracing::info!(
            "Streaming completed in {:.2}s",
            self.elapsed().as_secs_f64()
        );
        self.source = None;
        self.state = StreamState::Done;
        if self.fragments == 0 {
            if let Some(error) = self.status_error.take() {
                return Some(self.fail(error));
            }
        }
        None
    }

    fn check_overflow(&mut self) -> Option<String> {
        let limit = self.max_pending_bytes?;
        let pending = self.decoder.pending_len();
        if pending > limit {
            return Some(self.fail(RelayError::StreamError(format!(
                "{pending} bytes pending without a complete JSON document (limit {limit})"
            ))));
        }
        None
    }
}

impl Stream for FragmentStream {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.state {
                StreamState::Done | StreamState::Errored => return Poll::Ready(None),
                StreamState::HaveDocument => match this.decoder.next_document() {
                    DecodeOutcome::DocumentParsed(envelope) => {
                        this.malformed_logged = false;
                        let mut fragment = envelope.content.map(|c| this.record(c));
                        if envelope.done {
                            tracing::info!(
                                "Streaming done after {:.2}s",
                                this.elapsed().as_secs_f64()
                            );
                            fragment = fragment.or(this.finish());
                        }
                        if let Some(fragment) = fragment {
                            return Poll::Ready(Some(fragment));
                        }
                    }
                    DecodeOutcome::NeedMoreData => {
                        if let Some(fragment) = this.check_overflow() {
                            return Poll::Ready(Some(fragment));
                        }
                        this.state = StreamState::AwaitingChunk;
                    }
                    DecodeOutcome::Malformed(reason) => {
                        if !this.malformed_logged {
                            tracing::debug!("Buffered data is not valid JSON yet: {}", reason);
                            this.malformed_logged = true;
                        }
                        if let Some(fragment) = this.check_overflow() {
                            return Poll::Ready(Some(fragment));
                        }
                        this.state = StreamState::AwaitingChunk;
                    }
                },
                StreamState::AwaitingChunk => {
                    if let Some(error) = this.pending_error.take() {
                        return Poll::Ready(Some(this.fail(error)));
                    }
                    let Some(source) = this.source.as_mut() else {
                        if let Some(fragment) = this.finish() {
                            return Poll::Ready(Some(fragment));
                        }
                        continue;
                    };
                    match source.as_mut().poll_next(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Some(Ok(chunk))) => {
                            if chunk.is_empty() {
                                continue;
                            }
                            tracing::debug!("Received chunk: {}", String::from_utf8_lossy(&chunk));
                            this.decoder.push(&chunk);
                            this.state = StreamState::HaveDocument;
                        }
                        Poll::Ready(Some(Err(error))) => {
                            return Poll::Ready(Some(this.fail(error)));
                        }
                        Poll::Ready(None) => {
                            if let Some(fragment) = this.finish() {
                                return Poll::Ready(Some(fragment));
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> ByteStream {
        let items: Vec<Result<Bytes, RelayError>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn stitches_documents_split_across_chunks() {
        let mut stream = FragmentStream::new(chunks(&[
            "{\"message\":",
            "{\"content\":\"hel",
            "lo\"}, \"done\":false}",
            "{\"message\":{\"content\":\" world\"},\"done\":true}",
        ]));

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment);
        }
        assert_eq!(fragments, ["hello", " world"]);
        assert_eq!(stream.accumulated(), "hello world");
        assert_eq!(stream.state(), StreamState::Done);
        assert_eq!(stream.fragments_emitted(), 2);
    }

    #[tokio::test]
    async fn done_stops_consuming_trailing_documents() {
        let stream = FragmentStream::new(chunks(&[
            "{\"message\":{\"content\":\"a\"},\"done\":true}{\"message\":{\"content\":\"b\"}}",
            "{\"message\":{\"content\":\"c\"}}",
        ]));
        assert_eq!(stream.collect_response().await, "a");
    }

    #[tokio::test]
    async fn transport_error_becomes_final_fragment() {
        let items: Vec<Result<Bytes, RelayError>> = vec![
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"partial answer\"}}")),
            Err(RelayError::ConnectionError("connection reset by peer".into())),
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"never\"}}")),
        ];
        let mut stream = FragmentStream::new(Box::pin(futures::stream::iter(items)));

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment);
        }
        assert_eq!(
            fragments,
            [
                "partial answer",
                "[Error: Connection error: connection reset by peer]"
            ]
        );
        assert_eq!(stream.state(), StreamState::Errored);
        assert_eq!(stream.accumulated(), "partial answer");
        assert!(matches!(
            stream.error(),
            Some(RelayError::ConnectionError(_))
        ));
    }

    #[tokio::test]
    async fn closed_stream_without_done_just_ends() {
        let mut stream = FragmentStream::new(chunks(&["{\"message\":{\"content\":\"x\"}}"]));
        assert_eq!(stream.next().await.as_deref(), Some("x"));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.state(), StreamState::Done);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn incomplete_tail_is_dropped_silently_at_close() {
        let stream = FragmentStream::new(chunks(&[
            "{\"message\":{\"content\":\"ok\"}}",
            "{\"message\":{\"cont",
        ]));
        assert_eq!(stream.collect_response().await, "ok");
    }

    #[tokio::test]
    async fn failed_stream_yields_only_error_fragment() {
        let stream = FragmentStream::failed(RelayError::TimeoutError("deadline elapsed".into()));
        assert_eq!(
            stream.collect_response().await,
            "[Error: Timeout error: deadline elapsed]"
        );
    }

    #[tokio::test]
    async fn status_error_reported_only_without_fragments() {
        let stream = FragmentStream::new(chunks(&["<html>Bad Gateway</html>"]))
            .with_status_error(RelayError::api_error(502, "Bad Gateway"));
        assert_eq!(
            stream.collect_response().await,
            "[Error: API error 502: Bad Gateway]"
        );

        let stream = FragmentStream::new(chunks(&["{\"message\":{\"content\":\"fine\"}}"]))
            .with_status_error(RelayError::api_error(500, "odd"));
        assert_eq!(stream.collect_response().await, "fine");
    }

    #[tokio::test]
    async fn pending_cap_turns_garbage_into_error() {
        let stream = FragmentStream::new(chunks(&["not json at all", " still not json"]))
            .with_max_pending_bytes(16);
        let response = stream.collect_response().await;
        assert!(response.starts_with("[Error: Stream error:"));
    }

    #[tokio::test]
    async fn documents_without_content_are_skipped() {
        let stream = FragmentStream::new(chunks(&[
            "{\"model\":\"m\"}\n[1,2]\n{\"message\":{\"content\":\"\"}}",
            "{\"message\":{\"content\":\"z\"}}{\"done\":true}",
        ]));
        assert_eq!(stream.collect_response().await, "z");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn logs_timing_and_errors() {
        let items: Vec<Result<Bytes, RelayError>> = vec![
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"a\"}}")),
            Err(RelayError::ConnectionError("reset".into())),
        ];
        let stream = FragmentStream::new(Box::pin(futures::stream::iter(items)));
        let _ = stream.collect_response().await;
        assert!(logs_contain("Received chunk"));
        assert!(logs_contain("Exception during streaming after"));

        let _ = FragmentStream::new(chunks(&["{\"done\":true}"]))
            .collect_response()
            .await;
        assert!(logs_contain("Streaming done after"));
        assert!(logs_contain("Streaming completed in"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn completion_is_logged_when_done_ends_the_stream() {
        let stream = FragmentStream::new(chunks(&[
            "{\"message\":{\"content\":\"bye\"},\"done\":true}",
        ]));
        assert_eq!(stream.collect_response().await, "bye");
        logs_assert(|lines: &[&str]| {
            let done = lines.iter().position(|l| l.contains("Streaming done after"));
            let completed = lines.iter().position(|l| l.contains("Streaming completed in"));
            match (done, completed) {
                (Some(d), Some(c)) if d < c => Ok(()),
                other => Err(format!("unexpected log order: {other:?}")),
            }
        });
    }
}
