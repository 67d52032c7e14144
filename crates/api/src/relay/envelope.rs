//! Relay message shapes.
//!
//! Inbound messages are loose JSON objects. Only the fields a given
//! direction needs are read; everything else is ignored unless the message
//! is passed through verbatim.

use serde_json::{Map, Value};

/// Inbound message body as sent by a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbound(Map<String, Value>);

impl Inbound {
    pub fn new(fields: Map<String, Value>) -> Self {
        Inbound(fields)
    }

    /// Dot-namespaced command name, if present and a string.
    pub fn command(&self) -> Option<&str> {
        self.0.get("command").and_then(Value::as_str)
    }

    fn field(&self, name: &str) -> Value {
        self.0.get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Inbound {
    fn from(fields: Map<String, Value>) -> Self {
        Inbound(fields)
    }
}

/// Web to desktop: `{from, id, command, payload}`.
pub fn command_envelope(from: &str, command: &str, inbound: &Inbound) -> Value {
    let mut out = Map::new();
    out.insert("from".to_string(), Value::from(from));
    out.insert("id".to_string(), inbound.field("id"));
    out.insert("command".to_string(), Value::from(command));
    out.insert("payload".to_string(), inbound.field("payload"));
    Value::Object(out)
}

/// Desktop to owner: `{id, status, result?, error?}`.
///
/// `result` and `error` are left out when the desktop did not send them.
pub fn response_envelope(inbound: &Inbound) -> Value {
    let mut out = Map::new();
    out.insert("id".to_string(), inbound.field("id"));
    out.insert("status".to_string(), inbound.field("status"));
    for optional in ["result", "error"] {
        if let Some(value) = inbound.0.get(optional) {
            out.insert(optional.to_string(), value.clone());
        }
    }
    Value::Object(out)
}

/// Either direction on the signaling channel: `{from, payload}`.
pub fn signaling_envelope(from: &str, inbound: &Inbound) -> Value {
    let mut out = Map::new();
    out.insert("from".to_string(), Value::from(from));
    out.insert("payload".to_string(), inbound.field("payload"));
    Value::Object(out)
}
