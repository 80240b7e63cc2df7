//! Event-stream decoding.
//!
//! The query service frames every application event as a `data:` line
//! carrying a JSON payload, with a bare `[DONE]` payload marking the end of
//! the stream. [`EventDecoder`] turns the raw response body into [`Event`]s.

pub mod decoder;
pub mod event;

pub use decoder::EventDecoder;
pub use event::Event;

/// Prefix of every line that carries an event payload.
pub const DATA_PREFIX: &str = "data:";

/// Payload that terminates the stream unconditionally.
pub const SENTINEL: &str = "[DONE]";
