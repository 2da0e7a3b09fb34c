//! Notification decoding
//!
//! Turns the text of one record into a typed [`EventData`]. Decoding is a pure
//! function; failures are reported as [`DecodeError`] and never end the stream.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{Envelope, EventData, NotificationType};

/// Decode the text of one record
pub fn decode(text: &str) -> Result<EventData, DecodeError> {
    let envelope = Envelope::parse(text)?;
    let payload = envelope.payload()?;
    decode_payload(payload)
}

/// Decode an already-extracted payload object
pub fn decode_payload(payload: Value) -> Result<EventData, DecodeError> {
    let ty = match payload.get("type") {
        None | Some(Value::Null) => return Err(DecodeError::MissingType),
        Some(Value::String(name)) => NotificationType::from_wire(name)
            .ok_or_else(|| DecodeError::UnknownType(name.clone()))?,
        Some(other) => return Err(DecodeError::UnknownType(other.to_string())),
    };

    let event = match ty {
        NotificationType::SplitUpdate => EventData::SplitUpdate(fields(ty, payload)?),
        NotificationType::SplitKill => EventData::SplitKill(fields(ty, payload)?),
        NotificationType::SegmentUpdate => EventData::SegmentUpdate(fields(ty, payload)?),
        NotificationType::Control => EventData::Control(fields(ty, payload)?),
    };

    Ok(event)
}

fn fields<T: DeserializeOwned>(ty: NotificationType, payload: Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|e| DecodeError::InvalidFields {
        ty,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::models::{Control, ControlType, SegmentUpdate, SplitKill, SplitUpdate};

    fn wrap(payload: Value) -> String {
        json!({ "data": payload.to_string() }).to_string()
    }

    #[test]
    fn test_split_update() {
        let event = decode(&wrap(json!({"type":"SPLIT_UPDATE","changeNumber":123}))).unwrap();
        assert_eq!(
            event,
            EventData::SplitUpdate(SplitUpdate { change_number: 123 })
        );
    }

    #[test]
    fn test_segment_update() {
        let event = decode(&wrap(
            json!({"type":"SEGMENT_UPDATE","changeNumber":55,"segmentName":"beta-users"}),
        ))
        .unwrap();
        assert_eq!(
            event,
            EventData::SegmentUpdate(SegmentUpdate {
                change_number: 55,
                segment_name: "beta-users".to_string(),
            })
        );
    }

    #[rstest]
    #[case::flag_name("flagName")]
    #[case::split_name_alias("splitName")]
    fn test_split_kill(#[case] name_field: &str) {
        let mut payload = json!({
            "type": "SPLIT_KILL",
            "changeNumber": 1591996754396i64,
            "defaultTreatment": "off",
        });
        payload[name_field] = json!("checkout_v2");

        let event = decode(&wrap(payload)).unwrap();
        assert_eq!(
            event,
            EventData::SplitKill(SplitKill {
                change_number: 1591996754396,
                flag_name: "checkout_v2".to_string(),
                default_treatment: "off".to_string(),
            })
        );
    }

    #[test]
    fn test_control() {
        let event =
            decode(&wrap(json!({"type":"CONTROL","controlType":"STREAMING_RESUMED"}))).unwrap();
        assert_eq!(
            event,
            EventData::Control(Control {
                control_type: ControlType::StreamingResumed,
            })
        );
    }

    #[test]
    fn test_inline_object_payload() {
        let text = r#"{"data":{"type":"SPLIT_UPDATE","changeNumber":7}}"#;
        assert_eq!(decode(text).unwrap().change_number(), Some(7));
    }

    #[rstest]
    #[case::not_json("not json at all")]
    #[case::no_data_field(r#"{"channel":"x"}"#)]
    #[case::payload_not_json(r#"{"data":"{oops"}"#)]
    #[case::payload_array(r#"{"data":[1,2]}"#)]
    fn test_structural_failures(#[case] text: &str) {
        let err = decode(text).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidEnvelope(_) | DecodeError::InvalidPayload(_)
        ));
    }

    #[test]
    fn test_unknown_type() {
        let err = decode(&wrap(json!({"type":"UNKNOWN_TYPE"}))).unwrap_err();
        assert_eq!(err, DecodeError::UnknownType("UNKNOWN_TYPE".to_string()));
    }

    #[test]
    fn test_missing_type() {
        let err = decode(&wrap(json!({"changeNumber":1}))).unwrap_err();
        assert_eq!(err, DecodeError::MissingType);
    }

    #[rstest]
    #[case::missing_change_number(json!({"type":"SPLIT_UPDATE"}))]
    #[case::string_change_number(json!({"type":"SPLIT_UPDATE","changeNumber":"123"}))]
    #[case::missing_segment_name(json!({"type":"SEGMENT_UPDATE","changeNumber":1}))]
    #[case::missing_treatment(json!({"type":"SPLIT_KILL","changeNumber":1,"flagName":"f"}))]
    #[case::missing_control_type(json!({"type":"CONTROL"}))]
    fn test_field_mismatch(#[case] payload: Value) {
        let err = decode(&wrap(payload)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFields { .. }), "{err:?}");
    }
}
