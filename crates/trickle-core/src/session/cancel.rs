use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::Request;

/// Conversation-level handle that keeps at most one request in flight.
///
/// Each request runs under its own [`CancellationToken`]. Starting a new one
/// with [`begin`] cancels the token of the previous request first, so its
/// decoder stops reading and its scheduler stops typing at their next
/// suspension point. The session id is the only state shared between
/// requests and is passed through unchanged.
///
/// [`begin`]: Conversation::begin
#[derive(Debug)]
pub struct Conversation {
    session_id: String,
    current: Mutex<Option<CancellationToken>>,
}

impl Conversation {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current: Mutex::new(None),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Builds a request for this conversation.
    pub fn request(&self, query: impl Into<String>) -> Request {
        Request::new(query, self.session_id.clone())
    }

    /// Retires the current request, if any, and returns a fresh token for
    /// the next one.
    pub fn begin(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            if !previous.is_cancelled() {
                debug!(
                    target: "trickle::session",
                    session_id = %self.session_id,
                    "Cancelling in-flight request before starting a new one"
                );
                previous.cancel();
            }
        }

        let token = CancellationToken::new();
        *current = Some(token.clone());
        token
    }

    /// Cancels the current request. Repeated calls, or calls once the
    /// request has already finished, have no further effect.
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.as_ref() {
            token.cancel();
        }
    }

    /// Token of the most recent request, if one was started.
    pub fn current_token(&self) -> Option<CancellationToken> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
