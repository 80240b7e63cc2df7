//! Test utilities for trickle-core
//!
//! Scripted transports and a recording observer, public so integration
//! tests and downstream crates can drive an orchestrator without a server.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures_util::{StreamExt, stream};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ByteStream, Request, StreamError, Transport};
use crate::session::{ObserverEvent, StreamObserver};

/// A byte stream that yields each chunk in order, then ends.
pub fn byte_stream<I>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = &'static str>,
{
    let chunks: Vec<Result<Bytes, StreamError>> = chunks
        .into_iter()
        .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
        .collect();
    Box::pin(stream::iter(chunks))
}

/// A byte stream fed by hand. It ends when the sender is dropped.
pub fn channel_byte_stream() -> (
    mpsc::UnboundedSender<Result<Bytes, StreamError>>,
    ByteStream,
) {
    let (tx, rx) = mpsc::unbounded();
    (tx, Box::pin(rx))
}

/// Records every observer callback in the order it arrived.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ObserverEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every character emitted so far, concatenated.
    pub fn characters(&self) -> String {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Character(ch) => Some(ch),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Status(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObserverEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn completions(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ObserverEvent::Complete))
            .count()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_character(&self, ch: char) {
        self.push(ObserverEvent::Character(ch));
    }

    fn on_status(&self, message: &str) {
        self.push(ObserverEvent::Status(message.to_string()));
    }

    fn on_complete(&self) {
        self.push(ObserverEvent::Complete);
    }

    fn on_error(&self, message: &str) {
        self.push(ObserverEvent::Error(message.to_string()));
    }
}

enum Script {
    Chunks {
        chunks: Vec<&'static str>,
        interval: Option<Duration>,
    },
    Fail {
        status_code: u16,
        details: String,
    },
}

/// Replays a fixed response for every request it is asked to open.
pub struct ScriptedTransport {
    script: Script,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self {
            script: Script::Chunks {
                chunks: chunks.into_iter().collect(),
                interval: None,
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Waits `interval` before each chunk.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if let Script::Chunks { interval: slot, .. } = &mut self.script {
            *slot = Some(interval);
        }
        self
    }

    /// Rejects every request as a server would with a non-success status.
    pub fn failing(status_code: u16, details: impl Into<String>) -> Self {
        Self {
            script: Script::Fail {
                status_code,
                details: details.into(),
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests opened so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open(&self, request: &Request, token: CancellationToken) -> Result<ByteStream, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if token.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        match &self.script {
            Script::Fail {
                status_code,
                details,
            } => Err(ApiError::ServerError {
                status_code: *status_code,
                details: details.clone(),
            }),
            Script::Chunks {
                chunks,
                interval: None,
            } => Ok(byte_stream(chunks.clone())),
            Script::Chunks {
                chunks,
                interval: Some(interval),
            } => {
                let interval = *interval;
                let paced = stream::iter(chunks.clone()).then(move |chunk| async move {
                    tokio::time::sleep(interval).await;
                    Ok::<_, StreamError>(Bytes::from_static(chunk.as_bytes()))
                });
                Ok(Box::pin(paced))
            }
        }
    }
}

/// Hands the test a sender for the body of the single request it serves.
pub struct ChannelTransport {
    body: Mutex<Option<ByteStream>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Bytes, StreamError>>) {
        let (tx, body) = channel_byte_stream();
        (
            Self {
                body: Mutex::new(Some(body)),
            },
            tx,
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn open(&self, _request: &Request, token: CancellationToken) -> Result<ByteStream, ApiError> {
        if token.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ApiError::Configuration("channel transport already opened".to_string()))
    }
}
