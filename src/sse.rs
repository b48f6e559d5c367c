//! Decoding of streamed chat-completions responses.
//!
//! The response body is a sequence of newline-terminated lines, each usually
//! prefixed with `data: ` and carrying one JSON [`ChatCompletionChunk`]. This
//! module turns the raw byte stream into a stream of [`DeltaEvent`]s.
//!
//! A line that cannot be decoded is logged and skipped. Only a failure of the
//! underlying byte stream is surfaced to the consumer.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_DECODE_ERRORS, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ChatCompletionChunk, DeltaEvent};
use crate::{Error, Result};

/// Prefix of a server-sent event data line.
const DATA_PREFIX: &str = "data: ";

/// Sentinel some OpenAI-compatible servers send after the last chunk.
const DONE_SENTINEL: &str = "[DONE]";

/// Longest unterminated line the decoder buffers before dropping it.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Incremental line decoder.
///
/// Bytes are buffered until a `\n` arrives, so a UTF-8 sequence split across
/// reads is only decoded once its line is complete. A line that grows past
/// the limit is dropped, along with the rest of it up to the next `\n`.
#[derive(Debug)]
pub struct DeltaDecoder {
    buffer: BytesMut,
    max_line: usize,
    discarding: bool,
}

impl Default for DeltaDecoder {
    fn default() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }
}

impl DeltaDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty decoder that drops lines longer than `max_line` bytes.
    pub fn with_max_line_bytes(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_line,
            discarding: false,
        }
    }

    /// Append bytes read from the response body.
    pub fn push(&mut self, mut bytes: &[u8]) {
        if self.discarding {
            match bytes.iter().position(|b| *b == b'\n') {
                Some(newline) => {
                    self.discarding = false;
                    bytes = &bytes[newline + 1..];
                }
                None => return,
            }
        }
        self.buffer.extend_from_slice(bytes);

        let line_start = self
            .buffer
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |newline| newline + 1);
        let partial = self.buffer.len() - line_start;
        if partial > self.max_line {
            STREAM_DECODE_ERRORS.click();
            tracing::warn!(
                bytes = partial,
                limit = self.max_line,
                "dropping stream line that exceeds the length limit"
            );
            self.buffer.truncate(line_start);
            self.discarding = true;
        }
    }

    /// Decode the next event from the complete lines buffered so far.
    ///
    /// Lines that yield no event are consumed. Returns `None` once only a
    /// partial line (or nothing) remains.
    pub fn next_event(&mut self) -> Option<DeltaEvent> {
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            if let Some(event) = decode_line(&line) {
                return Some(event);
            }
        }
        None
    }

    /// Number of bytes held for a line that has not ended yet.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.remaining()
    }

    /// Discard an unterminated trailing line at end of input.
    pub fn finish(&mut self) {
        self.discarding = false;
        if !self.buffer.is_empty() {
            tracing::debug!(
                bytes = self.buffer.len(),
                "discarding unterminated line at end of stream"
            );
            self.buffer.clear();
        }
    }
}

/// Decode one raw protocol line.
///
/// Returns `None` for blank lines, the `[DONE]` sentinel, chunks without
/// choices, and anything that fails to decode.
pub fn decode_line(raw: &[u8]) -> Option<DeltaEvent> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(err) => {
            STREAM_DECODE_ERRORS.click();
            tracing::warn!("skipping stream line with invalid UTF-8: {err}");
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    if payload == DONE_SENTINEL {
        tracing::trace!("end-of-stream sentinel");
        return None;
    }
    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => {
            tracing::trace!(?chunk, "decoded chunk");
            let event = DeltaEvent::from_chunk(chunk);
            if event.is_none() {
                tracing::debug!("chunk without choices");
            }
            event
        }
        Err(err) => {
            STREAM_DECODE_ERRORS.click();
            tracing::warn!("skipping undecodable stream line {payload:?}: {err}");
            None
        }
    }
}

/// Process a stream of bytes into a stream of delta events.
///
/// Every call starts from an empty buffer. The returned stream ends when the
/// byte stream ends; a partial final line is discarded.
///
/// # Example
///
/// ```
/// # use bytes::Bytes;
/// # use futures::{StreamExt, stream};
/// # use quickgroq::{DeltaEvent, decode_deltas};
/// # tokio_test::block_on(async {
/// let body = stream::iter(vec![
///     Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n")),
///     Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{}}]}\n")),
/// ]);
/// let events: Vec<_> = decode_deltas(body).collect().await;
/// assert_eq!(events[0].as_ref().unwrap(), &DeltaEvent::fragment("Hi"));
/// assert!(events[1].as_ref().unwrap().is_end_of_turn());
/// # });
/// ```
pub fn decode_deltas<S>(byte_stream: S) -> impl Stream<Item = Result<DeltaEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    stream::unfold(
        (byte_stream, DeltaDecoder::new()),
        |(mut byte_stream, mut decoder)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some(event) = decoder.next_event() {
                    STREAM_EVENTS.click();
                    return Some((Ok(event), (byte_stream, decoder)));
                }

                // Read more data
                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        decoder.push(&bytes);
                    }
                    Some(Err(err)) => {
                        STREAM_ERRORS.click();
                        tracing::debug!(pending = decoder.pending_bytes(), "byte stream failed");
                        return Some((Err(err), (byte_stream, decoder)));
                    }
                    None => {
                        decoder.finish();
                        return None;
                    }
                }
            }
        },
    )
}

/// Adapt a reqwest body stream to the decoder's input.
pub(crate) fn map_body_errors<S>(body: S) -> impl Stream<Item = Result<Bytes>> + Send + Unpin
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + Unpin,
{
    body.map(|result| {
        result.map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    })
}
