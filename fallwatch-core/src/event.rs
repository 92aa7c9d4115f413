// Inbound alert payloads

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

pub const FALL_DETECTION_TYPE: &str = "fall_detection";

/// Location shown when the server did not report one.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Alert events pushed by the server, tagged by their `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AlertEvent {
    #[serde(rename = "fall_detection")]
    FallDetection(FallDetection),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallDetection {
    pub timestamp: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fall_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Alert(AlertEvent),
    /// Well-formed payload whose `type` this client does not handle.
    Ignored { kind: String },
}

/// Decode a text frame into an [`Inbound`] value.
///
/// Unknown `type` values are not errors; they come back as [`Inbound::Ignored`].
pub fn decode(text: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;

    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        _ => return Err(DecodeError::NotAnObject),
    };

    if kind != FALL_DETECTION_TYPE {
        return Ok(Inbound::Ignored { kind });
    }

    serde_json::from_value::<AlertEvent>(value)
        .map(Inbound::Alert)
        .map_err(|source| DecodeError::Malformed { kind, source })
}

impl FallDetection {
    /// Location label with the `"Unknown"` fallback for missing or blank values.
    pub fn location_label(&self) -> &str {
        match self.location.as_deref() {
            Some(location) if !location.trim().is_empty() => location,
            _ => UNKNOWN_LOCATION,
        }
    }

    /// Parse the timestamp, accepting RFC 3339 and offset-less ISO 8601.
    ///
    /// Offset-less timestamps are read as UTC, which is how the server records them.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
