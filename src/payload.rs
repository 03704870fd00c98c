//! The message body carried on the `logs_topic` exchange.

use serde::{Deserialize, Serialize};

/// A structured log/event message.
///
/// `name` selects the handling path; `data` is opaque and is commonly a
/// serialized structure of its own. Field order on the wire is `name`, `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payload {
    pub name: String,
    pub data: String,
}

impl Payload {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Decode a message body. Missing fields decode as empty strings.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Decode a message body, falling back to an empty payload.
    pub fn decode_lenient(body: &[u8]) -> Self {
        Self::decode(body).unwrap_or_default()
    }

    /// Compact JSON, as published to the broker.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Tab-indented JSON, as posted to the logging service.
    pub fn to_indented_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}
