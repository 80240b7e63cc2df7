use futures_core::Stream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use tokio_util::bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{DATA_PREFIX, Event, SENTINEL};
use crate::api::StreamError;

/// Incremental decoder for the line-framed event stream.
///
/// Pull-based: nothing is read from the source until [`next_event`] is
/// awaited. Bytes that do not yet end in a newline stay buffered and are
/// joined with the next chunk, so frames split anywhere (including inside a
/// multi-byte character) decode the same as if they arrived whole.
///
/// [`next_event`]: EventDecoder::next_event
pub struct EventDecoder<S> {
    source: S,
    token: CancellationToken,
    buffer: Vec<u8>,
    pending: VecDeque<Event>,
    source_done: bool,
    terminated: bool,
}

impl<S> EventDecoder<S>
where
    S: Stream<Item = Result<Bytes, StreamError>> + Unpin + Send,
{
    pub fn new(source: S, token: CancellationToken) -> Self {
        Self {
            source,
            token,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            source_done: false,
            terminated: false,
        }
    }

    /// Next decoded event, `Ok(None)` once the stream is exhausted or a
    /// terminal event has been returned.
    ///
    /// A cancelled token wins over anything still buffered: partial data and
    /// decoded-but-unreturned events are dropped and no further reads are
    /// issued.
    pub async fn next_event(&mut self) -> Result<Option<Event>, StreamError> {
        loop {
            if self.token.is_cancelled() {
                return Err(self.abandon());
            }

            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.pending.clear();
                    self.terminated = true;
                }
                return Ok(Some(event));
            }

            if self.terminated || self.source_done {
                return Ok(None);
            }

            let chunk = tokio::select! {
                biased;
                () = self.token.cancelled() => {
                    debug!(target: "trickle::decoder", "Cancellation token triggered while waiting for data.");
                    return Err(self.abandon());
                }
                chunk = self.source.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    trace!(target: "trickle::decoder", len = bytes.len(), "Received chunk");
                    self.ingest(&bytes);
                }
                Some(Err(e)) => {
                    debug!(target: "trickle::decoder", "Transport failed mid-stream: {}", e);
                    self.terminated = true;
                    self.buffer.clear();
                    self.pending.clear();
                    return Err(e);
                }
                None => {
                    self.source_done = true;
                    self.flush_tail();
                }
            }
        }
    }

    /// Whether no further events will be produced.
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && (self.terminated || self.source_done)
    }

    fn abandon(&mut self) -> StreamError {
        if !self.buffer.is_empty() || !self.pending.is_empty() {
            debug!(
                target: "trickle::decoder",
                buffered_bytes = self.buffer.len(),
                pending_events = self.pending.len(),
                "Discarding undelivered data after cancellation"
            );
        }
        self.buffer.clear();
        self.pending.clear();
        self.terminated = true;
        StreamError::Cancelled
    }

    fn ingest(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = end + 1;

            if self.handle_line(&line) {
                // Anything after a terminal line is never looked at.
                self.buffer.clear();
                self.terminated = true;
                return;
            }
        }

        self.buffer.drain(..start);
    }

    fn flush_tail(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let tail = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&tail).into_owned();
        if self.handle_line(&line) {
            self.terminated = true;
        }
    }

    /// Queues the event carried by `line`, if any. Returns true for a
    /// terminal line.
    fn handle_line(&mut self, line: &str) -> bool {
        let line = line.strip_suffix('\r').unwrap_or(line);

        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return false;
        };
        let payload = rest.strip_prefix(' ').unwrap_or(rest);

        if payload == SENTINEL {
            debug!(target: "trickle::decoder", "Received end-of-stream sentinel");
            self.pending.push_back(Event::Complete);
            return true;
        }

        match Event::from_payload(payload) {
            Some(event) => {
                let terminal = event.is_terminal();
                self.pending.push_back(event);
                terminal
            }
            None => false,
        }
    }
}

impl<S> EventDecoder<S>
where
    S: Stream<Item = Result<Bytes, StreamError>> + Unpin + Send + 'static,
{
    /// Adapts the decoder into a `Stream`. An error is yielded once and ends
    /// the stream.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Event, StreamError>> + Send {
        async_stream::stream! {
            loop {
                match self.next_event().await {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}
