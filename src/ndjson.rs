//! Newline-delimited JSON processing for streaming query responses.
//!
//! The backend answers `/query/stream` with one JSON object per line. This
//! module splits the raw byte stream into lines with [`NdjsonDecoder`] and
//! parses each line into a [`StreamEvent`]. A line that fails to parse
//! becomes an `Err` item for that line alone; decoding carries on with the
//! next line.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use tokio_util::codec::Decoder;

use crate::observability::{
    STREAM_BYTES, STREAM_DURATION, STREAM_ERRORS, STREAM_LINES, STREAM_MALFORMED_LINES,
    STREAM_TTFB,
};
use crate::{Error, Result, StreamEvent};

/// A boxed stream of parsed events, as returned by the backend seam.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Longest excerpt of a malformed line quoted in its error message.
const MAX_QUOTED_LINE: usize = 120;

/// Splits bytes into trimmed, non-empty lines.
///
/// `next_index` is the scan cursor: bytes before it are known to contain no
/// newline, so a line that arrives across many chunks is scanned once.
/// Lines are only decoded as UTF-8 once complete, so a multi-byte character
/// split across chunks is never misread.
#[derive(Debug, Default, Clone)]
pub struct NdjsonDecoder {
    next_index: usize,
}

impl NdjsonDecoder {
    /// Creates a decoder with an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for NdjsonDecoder {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let read_to = buf.len();
            let Some(offset) = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
            else {
                self.next_index = read_to;
                return Ok(None);
            };
            let newline = self.next_index + offset;
            self.next_index = 0;
            let line = buf.split_to(newline + 1);
            if let Some(text) = line_text(&line[..newline])? {
                return Ok(Some(text));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        line_text(&rest)
    }
}

fn line_text(line: &[u8]) -> Result<Option<String>> {
    let text = std::str::from_utf8(line)?.trim();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text.to_string()))
    }
}

/// Feed-and-drain wrapper around [`NdjsonDecoder`].
///
/// Feed it chunks as they arrive; it returns every line completed by the
/// chunk and keeps the partial remainder for the next call.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: BytesMut,
    decoder: NdjsonDecoder,
}

impl LineBuffer {
    /// Creates an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the lines it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        loop {
            match self.decoder.decode(&mut self.buffer) {
                Ok(Some(line)) => lines.push(Ok(line)),
                Ok(None) => break,
                Err(err) => lines.push(Err(err)),
            }
        }
        lines
    }

    /// Flushes an unterminated final line at end of input.
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let mut lines = Vec::new();
        loop {
            match self.decoder.decode_eof(&mut self.buffer) {
                Ok(Some(line)) => lines.push(Ok(line)),
                Ok(None) => break,
                Err(err) => lines.push(Err(err)),
            }
        }
        lines
    }

    /// Number of buffered bytes not yet part of a complete line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Parses one complete NDJSON line.
pub fn parse_line(line: &str) -> Result<StreamEvent> {
    serde_json::from_str::<StreamEvent>(line).map_err(|e| {
        Error::serialization(
            format!("Malformed stream line ({e}): {}", excerpt(line)),
            Some(Box::new(e)),
        )
    })
}

fn excerpt(line: &str) -> String {
    if line.chars().count() <= MAX_QUOTED_LINE {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MAX_QUOTED_LINE).collect();
        format!("{cut}...")
    }
}

/// Process a stream of bytes into a stream of NDJSON events.
///
/// Per-line failures (`Serialization`, `Encoding`) are yielded in place and
/// the stream continues. A transport failure or an idle timeout is yielded
/// once and ends the stream. `idle_timeout` bounds the wait for each chunk.
///
/// ```
/// # use bytes::Bytes;
/// # use futures::{StreamExt, stream};
/// # use devconsole::{StreamEvent, process_ndjson};
/// # tokio_test::block_on(async {
/// let chunks = vec![
///     Ok(Bytes::from_static(b"{\"type\": \"status\", \"message\": \"Work")),
///     Ok(Bytes::from_static(b"ing...\"}\n{\"type\": \"complete\"}")),
/// ];
/// let events: Vec<_> = process_ndjson(stream::iter(chunks), None).collect().await;
/// assert_eq!(events.len(), 2);
/// assert!(matches!(&events[0], Ok(StreamEvent::Status { message }) if message == "Working..."));
/// assert!(matches!(&events[1], Ok(StreamEvent::Complete { .. })));
/// # });
/// ```
pub fn process_ndjson<S>(
    byte_stream: S,
    idle_timeout: Option<Duration>,
) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let state = NdjsonState {
        stream: byte_stream,
        lines: LineBuffer::new(),
        pending: VecDeque::new(),
        done: false,
        started: Instant::now(),
        first_byte_seen: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, state.stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        state.finish();
                        STREAM_ERRORS.click();
                        return Some((
                            Err(Error::timeout(
                                "no data received from the backend",
                                Some(limit.as_secs_f64()),
                            )),
                            state,
                        ));
                    }
                },
                None => state.stream.next().await,
            };

            match next {
                Some(Ok(bytes)) => {
                    if !state.first_byte_seen {
                        state.first_byte_seen = true;
                        STREAM_TTFB.add(state.started.elapsed().as_secs_f64());
                    }
                    STREAM_BYTES.count(bytes.len() as u64);
                    let lines = state.lines.feed(&bytes);
                    state.queue(lines);
                }
                Some(Err(e)) => {
                    state.finish();
                    STREAM_ERRORS.click();
                    return Some((Err(e), state));
                }
                None => {
                    let lines = state.lines.finish();
                    state.queue(lines);
                    state.finish();
                }
            }
        }
    })
}

struct NdjsonState<S> {
    stream: S,
    lines: LineBuffer,
    pending: VecDeque<Result<StreamEvent>>,
    done: bool,
    started: Instant,
    first_byte_seen: bool,
}

impl<S> NdjsonState<S> {
    fn queue(&mut self, lines: Vec<Result<String>>) {
        for line in lines {
            STREAM_LINES.click();
            let event = line.and_then(|line| parse_line(&line));
            if event.is_err() {
                STREAM_MALFORMED_LINES.click();
            }
            self.pending.push_back(event);
        }
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_EVENTS: &str = concat!(
        "{\"type\": \"status\", \"message\": \"Analyzing requirements...\"}\n",
        "{\"type\": \"developer_result\", \"response\": \"caf\u{e9} ready\"}\n",
        "{\"type\": \"complete\", \"message\": \"Task completed\"}\n",
    );

    fn chunked(data: &[u8], size: usize) -> Vec<Result<Bytes>> {
        data.chunks(size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect()
    }

    async fn collect(chunks: Vec<Result<Bytes>>) -> Vec<Result<StreamEvent>> {
        process_ndjson(stream::iter(chunks), None).collect().await
    }

    fn kinds(events: &[Result<StreamEvent>]) -> Vec<String> {
        events
            .iter()
            .map(|event| match event {
                Ok(event) => event.kind().to_string(),
                Err(_) => "ERR".to_string(),
            })
            .collect()
    }

    #[test]
    fn feed_retains_partial_line() {
        let mut lines = LineBuffer::new();
        let out = lines.feed(b"{\"type\": \"status\", \"mess");
        assert!(out.is_empty());
        assert!(lines.pending() > 0);
        let out = lines.feed(b"age\": \"hi\"}\n{\"type\"");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].as_ref().unwrap(),
            "{\"type\": \"status\", \"message\": \"hi\"}"
        );
        assert_eq!(lines.pending(), "{\"type\"".len());
    }

    #[test]
    fn blank_lines_and_carriage_returns_are_dropped() {
        let mut lines = LineBuffer::new();
        let out = lines.feed(b"\n  \r\n{\"a\":1}\r\n\n");
        let out: Vec<String> = out.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(out, vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut lines = LineBuffer::new();
        assert!(lines.feed(b"{\"type\": \"complete\"}").is_empty());
        let out = lines.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap(), "{\"type\": \"complete\"}");
        assert!(lines.finish().is_empty());
    }

    #[test]
    fn invalid_utf8_fails_only_its_line() {
        let mut lines = LineBuffer::new();
        let out = lines.feed(b"\xff\xfe\n{\"ok\":true}\n");
        assert_eq!(out.len(), 2);
        assert!(out[0].is_err());
        assert_eq!(out[1].as_ref().unwrap(), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn chunk_boundaries_do_not_change_events() {
        let whole = collect(vec![Ok(Bytes::from(THREE_EVENTS))]).await;
        let whole: Vec<StreamEvent> = whole.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(whole.len(), 3);

        for size in [1, 2, 3, 7, 16, 64] {
            let events = collect(chunked(THREE_EVENTS.as_bytes(), size)).await;
            let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
            assert_eq!(events, whole, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn malformed_line_between_valid_lines() {
        let data = concat!(
            "{\"type\": \"status\", \"message\": \"one\"}\n",
            "{not json\n",
            "{\"type\": \"status\", \"message\": \"two\"}\n",
        );
        let events = collect(chunked(data.as_bytes(), 5)).await;
        assert_eq!(kinds(&events), vec!["status", "ERR", "status"]);
        match &events[1] {
            Err(Error::Serialization { message, .. }) => {
                assert!(message.contains("{not json"));
            }
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let chunks = vec![
            Ok(Bytes::from("{\"type\": \"status\", \"message\": \"one\"}\n")),
            Err(Error::streaming("connection reset", None)),
            Ok(Bytes::from("{\"type\": \"complete\"}\n")),
        ];
        let events = collect(chunks).await;
        assert_eq!(kinds(&events), vec!["status", "ERR"]);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_yields_timeout_error() {
        let first = stream::iter(vec![Ok(Bytes::from(
            "{\"type\": \"status\", \"message\": \"one\"}\n",
        ))]);
        let stalled = first.chain(stream::pending());
        let events: Vec<Result<StreamEvent>> =
            process_ndjson(Box::pin(stalled), Some(Duration::from_secs(30)))
                .collect()
                .await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(&events[1], Err(e) if e.is_timeout()));
    }
}
