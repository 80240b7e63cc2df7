use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One user turn sent to the query service.
///
/// `fields` carries routing and auth values the core never inspects; they
/// are flattened into the JSON body next to `query` and `session_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub query: String,
    pub session_id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Body keys owned by the request itself; extra fields never shadow them.
const RESERVED_KEYS: [&str; 2] = ["query", "session_id"];

impl Request {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: session_id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !RESERVED_KEYS.contains(&key.as_str()) {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Merges `fields` without replacing values already set.
    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        for (key, value) in fields {
            if !RESERVED_KEYS.contains(&key.as_str()) {
                self.fields.entry(key).or_insert(value);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_flatten_into_body() {
        let request = Request::new("hello", "sess-1")
            .with_field("user_id", "u-42")
            .with_field("tenant", json!({"region": "eu"}));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "query": "hello",
                "session_id": "sess-1",
                "user_id": "u-42",
                "tenant": {"region": "eu"}
            })
        );
    }

    #[test]
    fn test_with_fields_keeps_explicit_values() {
        let mut defaults = Map::new();
        defaults.insert("user_id".to_string(), json!("from-config"));
        defaults.insert("channel".to_string(), json!("cli"));

        let request = Request::new("q", "s")
            .with_field("user_id", "explicit")
            .with_fields(defaults);

        assert_eq!(request.fields["user_id"], json!("explicit"));
        assert_eq!(request.fields["channel"], json!("cli"));
    }

    #[test]
    fn test_reserved_keys_are_not_overridden() {
        let mut extra = Map::new();
        extra.insert("session_id".to_string(), json!("hijacked"));

        let request = Request::new("q", "sess-1")
            .with_field("query", "other")
            .with_fields(extra);

        assert!(request.fields.is_empty());
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, json!({"query": "q", "session_id": "sess-1"}));
    }
}
