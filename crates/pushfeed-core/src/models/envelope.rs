//! Outer message wrapping a notification payload

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Envelope as received on the wire
///
/// The upstream feed sends the payload as a JSON-encoded string in `data`;
/// an inline object is accepted as well.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: Option<String>,
    pub client_id: Option<String>,
    pub timestamp: Option<i64>,
    pub encoding: Option<String>,
    pub channel: Option<String>,
    /// Opaque payload holding the typed notification
    pub data: Value,
}

impl Envelope {
    /// Parse an envelope from record text
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(text).map_err(|e| DecodeError::InvalidEnvelope(e.to_string()))
    }

    /// Extract the nested payload object
    pub fn payload(&self) -> Result<Value, DecodeError> {
        let payload = match &self.data {
            Value::String(encoded) => serde_json::from_str::<Value>(encoded)
                .map_err(|e| DecodeError::InvalidPayload(e.to_string()))?,
            other => other.clone(),
        };

        if payload.is_object() {
            Ok(payload)
        } else {
            Err(DecodeError::InvalidPayload(format!(
                "expected an object, got {}",
                json_kind(&payload)
            )))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_is_optional() {
        let envelope = Envelope::parse(r#"{"data":{"type":"CONTROL"}}"#).unwrap();
        assert!(envelope.channel.is_none());
        assert!(envelope.payload().unwrap().is_object());
    }

    #[test]
    fn test_string_payload_is_unwrapped() {
        let envelope = Envelope::parse(
            r#"{"id":"a1","clientId":"c","timestamp":1591996755043,"encoding":"json","channel":"xxxx_splits","data":"{\"type\":\"SPLIT_UPDATE\",\"changeNumber\":1}"}"#,
        )
        .unwrap();
        assert_eq!(envelope.channel.as_deref(), Some("xxxx_splits"));
        assert_eq!(envelope.payload().unwrap()["changeNumber"], 1);
    }

    #[test]
    fn test_scalar_payload_is_rejected() {
        let envelope = Envelope::parse(r#"{"data":42}"#).unwrap();
        assert!(matches!(
            envelope.payload(),
            Err(DecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_missing_data_field() {
        assert!(matches!(
            Envelope::parse(r#"{"id":"x"}"#),
            Err(DecodeError::InvalidEnvelope(_))
        ));
    }
}
