use serde_json::Value;
use strum::Display;
use tracing::debug;

/// Application-level event decoded from one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    Content { text: String },
    Status { message: String },
    Complete,
    Error { message: String },
}

impl Event {
    /// Complete and Error end the stream; nothing after them is decoded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Complete | Event::Error { .. })
    }

    /// Classifies one payload. Returns `None` for anything that is not a
    /// JSON object or matches no known shape.
    ///
    /// Shapes are checked in a fixed order and the first match wins:
    /// a non-empty `content` string, then `type: "status"` with a
    /// `message`, then `type: "complete"`, then a non-empty `error`.
    pub fn from_payload(payload: &str) -> Option<Event> {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                debug!(target: "trickle::decoder", "Failed to parse payload: {} data: {}", e, payload);
                return None;
            }
        };

        let Value::Object(fields) = value else {
            debug!(target: "trickle::decoder", "Ignoring non-object payload: {}", payload);
            return None;
        };

        if let Some(text) = fields
            .get("content")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Some(Event::Content {
                text: text.to_string(),
            });
        }

        let kind = fields.get("type").and_then(Value::as_str);

        if kind == Some("status") {
            if let Some(message) = fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
            {
                return Some(Event::Status {
                    message: message.to_string(),
                });
            }
        }

        if kind == Some("complete") {
            return Some(Event::Complete);
        }

        match fields.get("error") {
            None | Some(Value::Null) => {}
            Some(Value::String(message)) if message.is_empty() => {}
            Some(Value::String(message)) => {
                return Some(Event::Error {
                    message: message.clone(),
                });
            }
            Some(other) => {
                return Some(Event::Error {
                    message: other.to_string(),
                });
            }
        }

        debug!(target: "trickle::decoder", "Ignoring unrecognized payload: {}", payload);
        None
    }
}
