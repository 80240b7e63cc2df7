use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Conversation, SessionOutcome, SessionState, StreamObserver};
use crate::api::{Request, StreamError, Transport};
use crate::stream::{Event, EventDecoder};
use crate::typing::{TypingConfig, TypingScheduler};

/// Drives one request from transport to typed output.
///
/// Decoding and typing run concurrently: content is queued on the
/// scheduler as soon as it is decoded and the next read starts right away,
/// so the visible text may trail the network. Status lines skip the queue.
/// The orchestrator alone decides how the request ends and reports that to
/// the observer at most once.
pub struct StreamOrchestrator {
    transport: Arc<dyn Transport>,
    typing: TypingConfig,
}

impl StreamOrchestrator {
    pub fn new(transport: Arc<dyn Transport>, typing: TypingConfig) -> Self {
        Self { transport, typing }
    }

    pub fn typing_config(&self) -> &TypingConfig {
        &self.typing
    }

    /// Runs `request` within `conversation`, retiring whatever request the
    /// conversation had in flight.
    pub async fn run_in(
        &self,
        conversation: &Conversation,
        request: &Request,
        observer: Arc<dyn StreamObserver>,
    ) -> SessionOutcome {
        let token = conversation.begin();
        self.run(request, token, observer).await
    }

    /// Streams `request` to `observer` until it completes, fails, or `token`
    /// is cancelled.
    ///
    /// On completion every decoded character is typed before `on_complete`.
    /// An error event or transport failure halts typing and calls
    /// `on_error`. Cancellation is silent.
    pub async fn run(
        &self,
        request: &Request,
        token: CancellationToken,
        observer: Arc<dyn StreamObserver>,
    ) -> SessionOutcome {
        let started_at = Instant::now();
        let mut state = SessionState::new();
        state.start();

        debug!(
            target: "trickle::session",
            session_id = %request.session_id,
            transport = self.transport.name(),
            "Starting request"
        );

        let body = match self.transport.open(request, token.clone()).await {
            Ok(body) => body,
            Err(e) if e.is_cancelled() || token.is_cancelled() => {
                let outcome = SessionOutcome::Cancelled;
                return Self::conclude(&mut state, outcome, observer.as_ref(), 0, started_at);
            }
            Err(e) => {
                warn!(target: "trickle::session", error = %e, "Failed to open event stream");
                let outcome = SessionOutcome::Errored {
                    reason: e.to_string(),
                };
                return Self::conclude(&mut state, outcome, observer.as_ref(), 0, started_at);
            }
        };

        let scheduler = TypingScheduler::new(self.typing.clone(), observer.clone(), &token);
        let mut decoder = EventDecoder::new(body, token.clone());

        let outcome = loop {
            match decoder.next_event().await {
                Ok(Some(Event::Content { text })) => scheduler.enqueue(&text),
                Ok(Some(Event::Status { message })) => observer.on_status(&message),
                Ok(Some(Event::Complete) | None) => {
                    scheduler.flush().await;
                    if token.is_cancelled() {
                        break SessionOutcome::Cancelled;
                    }
                    break SessionOutcome::Completed;
                }
                Ok(Some(Event::Error { message })) => {
                    scheduler.halt();
                    break SessionOutcome::Errored { reason: message };
                }
                Err(StreamError::Cancelled) => {
                    scheduler.halt();
                    break SessionOutcome::Cancelled;
                }
                Err(StreamError::Transport { details }) => {
                    scheduler.halt();
                    if token.is_cancelled() {
                        break SessionOutcome::Cancelled;
                    }
                    warn!(target: "trickle::session", error = %details, "Event stream failed");
                    break SessionOutcome::Errored { reason: details };
                }
            }
        };

        let emitted = scheduler.emitted();
        Self::conclude(&mut state, outcome, observer.as_ref(), emitted, started_at)
    }

    fn conclude(
        state: &mut SessionState,
        outcome: SessionOutcome,
        observer: &dyn StreamObserver,
        emitted: usize,
        started_at: Instant,
    ) -> SessionOutcome {
        if !state.finish(outcome.clone()) {
            // Unreachable with a fresh state per run; keep the first outcome.
            return state.outcome().cloned().unwrap_or(outcome);
        }

        match &outcome {
            SessionOutcome::Completed => observer.on_complete(),
            SessionOutcome::Errored { reason } => observer.on_error(reason),
            SessionOutcome::Cancelled => {}
        }

        info!(
            target: "trickle::session",
            phase = %outcome.phase(),
            characters = emitted,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Request finished"
        );
        outcome
    }
}
