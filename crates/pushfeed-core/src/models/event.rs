//! Typed notification payloads carried by the feed

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator values found in the `type` field of a notification payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A flag definition changed
    SplitUpdate,
    /// A flag was force-disabled
    SplitKill,
    /// A named segment changed
    SegmentUpdate,
    /// Connection-control signal
    Control,
}

impl NotificationType {
    /// Wire representation of the discriminator
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::SplitUpdate => "SPLIT_UPDATE",
            NotificationType::SplitKill => "SPLIT_KILL",
            NotificationType::SegmentUpdate => "SEGMENT_UPDATE",
            NotificationType::Control => "CONTROL",
        }
    }

    /// Parse a wire discriminator, `None` when it is not one of the known values
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "SPLIT_UPDATE" => Some(NotificationType::SplitUpdate),
            "SPLIT_KILL" => Some(NotificationType::SplitKill),
            "SEGMENT_UPDATE" => Some(NotificationType::SegmentUpdate),
            "CONTROL" => Some(NotificationType::Control),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SPLIT_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitUpdate {
    /// Change number of the updated definition
    pub change_number: i64,
}

/// SPLIT_KILL payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitKill {
    /// Change number at which the kill took effect
    pub change_number: i64,
    /// Name of the killed flag
    #[serde(alias = "splitName")]
    pub flag_name: String,
    /// Treatment served while the flag is killed
    pub default_treatment: String,
}

/// SEGMENT_UPDATE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentUpdate {
    /// Change number of the updated segment
    pub change_number: i64,
    /// Name of the segment that changed
    pub segment_name: String,
}

/// CONTROL payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Requested streaming state
    pub control_type: ControlType,
}

/// Streaming control signals
///
/// Unrecognised values are kept verbatim in [`ControlType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlType {
    StreamingPaused,
    StreamingResumed,
    StreamingDisabled,
    Other(String),
}

impl ControlType {
    pub fn as_str(&self) -> &str {
        match self {
            ControlType::StreamingPaused => "STREAMING_PAUSED",
            ControlType::StreamingResumed => "STREAMING_RESUMED",
            ControlType::StreamingDisabled => "STREAMING_DISABLED",
            ControlType::Other(value) => value,
        }
    }
}

impl From<String> for ControlType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "STREAMING_PAUSED" => ControlType::StreamingPaused,
            "STREAMING_RESUMED" => ControlType::StreamingResumed,
            "STREAMING_DISABLED" => ControlType::StreamingDisabled,
            _ => ControlType::Other(value),
        }
    }
}

impl From<ControlType> for String {
    fn from(value: ControlType) -> Self {
        match value {
            ControlType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

/// A decoded notification, tagged by its `type` discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventData {
    SplitUpdate(SplitUpdate),
    SplitKill(SplitKill),
    SegmentUpdate(SegmentUpdate),
    Control(Control),
}

impl EventData {
    /// Discriminator of this event
    pub fn notification_type(&self) -> NotificationType {
        match self {
            EventData::SplitUpdate(_) => NotificationType::SplitUpdate,
            EventData::SplitKill(_) => NotificationType::SplitKill,
            EventData::SegmentUpdate(_) => NotificationType::SegmentUpdate,
            EventData::Control(_) => NotificationType::Control,
        }
    }

    /// Change number carried by the event, if the variant has one
    pub fn change_number(&self) -> Option<i64> {
        match self {
            EventData::SplitUpdate(e) => Some(e.change_number),
            EventData::SplitKill(e) => Some(e.change_number),
            EventData::SegmentUpdate(e) => Some(e.change_number),
            EventData::Control(_) => None,
        }
    }
}

impl fmt::Display for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::SplitUpdate(e) => {
                write!(f, "SPLIT_UPDATE changeNumber={}", e.change_number)
            }
            EventData::SplitKill(e) => write!(
                f,
                "SPLIT_KILL changeNumber={} flagName={} defaultTreatment={}",
                e.change_number, e.flag_name, e.default_treatment
            ),
            EventData::SegmentUpdate(e) => write!(
                f,
                "SEGMENT_UPDATE changeNumber={} segmentName={}",
                e.change_number, e.segment_name
            ),
            EventData::Control(e) => {
                write!(f, "CONTROL controlType={}", e.control_type.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_wire_names() {
        for ty in [
            NotificationType::SplitUpdate,
            NotificationType::SplitKill,
            NotificationType::SegmentUpdate,
            NotificationType::Control,
        ] {
            assert_eq!(NotificationType::from_wire(ty.as_str()), Some(ty));
        }
        assert_eq!(NotificationType::from_wire("split_update"), None);
    }

    #[test]
    fn test_control_type_keeps_unknown_values() {
        let control: Control =
            serde_json::from_str(r#"{"controlType":"STREAMING_RESET"}"#).unwrap();
        assert_eq!(
            control.control_type,
            ControlType::Other("STREAMING_RESET".to_string())
        );
        assert_eq!(control.control_type.as_str(), "STREAMING_RESET");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = EventData::SegmentUpdate(SegmentUpdate {
            change_number: 55,
            segment_name: "beta-users".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SEGMENT_UPDATE");
        assert_eq!(json["changeNumber"], 55);
        assert_eq!(json["segmentName"], "beta-users");
    }

    #[test]
    fn test_display() {
        let event = EventData::Control(Control {
            control_type: ControlType::StreamingPaused,
        });
        assert_eq!(event.to_string(), "CONTROL controlType=STREAMING_PAUSED");
        assert_eq!(event.change_number(), None);
    }
}
