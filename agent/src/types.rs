//! Alert schema as sent to the AlertHub server.
//!
//! The JSON shape matches what the server's `POST /alert` accepts. Timestamps
//! are UTC wall-clock time rendered as `YYYY-MM-DDTHH:MM:SS` with no zone
//! marker.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Wire format of alert timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One alert produced by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Identifier of the producing agent.
    pub source: String,

    /// Event category; also the rate-limiting key.
    pub event_type: String,

    /// Free-form severity label (`low`, `medium`, `high`, ...).
    pub severity: String,

    /// Human-readable message.
    pub message: String,

    /// Creation time, second resolution.
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,

    /// Opaque structured detail.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Alert {
    /// Creates a new alert with a random id, stamped with the current UTC time.
    ///
    /// # Examples
    ///
    /// ```
    /// use alerthub_agent::types::Alert;
    /// use serde_json::Map;
    ///
    /// let alert = Alert::new("host-1", "cpu_high", "high", "CPU 95%", Map::new());
    ///
    /// assert_eq!(alert.event_type, "cpu_high");
    /// assert_eq!(alert.id.len(), 36);
    /// ```
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        severity: impl Into<String>,
        message: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            severity: severity.into(),
            message: message.into(),
            timestamp: Utc::now().naive_utc(),
            payload,
        }
    }
}

mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_alert_has_unique_uuid_ids() {
        let a = Alert::new("src", "cpu_high", "high", "m", Map::new());
        let b = Alert::new("src", "cpu_high", "high", "m", Map::new());

        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn timestamp_serializes_at_second_resolution() {
        let alert = Alert::new("src", "cpu_high", "high", "m", Map::new());
        let value = serde_json::to_value(&alert).unwrap();
        let raw = value["timestamp"].as_str().unwrap();

        assert_eq!(raw.len(), "2024-05-01T12:00:00".len());
        assert!(!raw.ends_with('Z'));
        assert!(NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn serializes_all_wire_fields() {
        let mut payload = Map::new();
        payload.insert("cpu".to_string(), json!(95));
        let alert = Alert::new("host-1", "cpu_high", "high", "CPU 95%", payload);

        let value = serde_json::to_value(&alert).unwrap();
        let obj = value.as_object().unwrap();

        for field in [
            "id",
            "source",
            "event_type",
            "severity",
            "message",
            "timestamp",
            "payload",
        ] {
            assert!(obj.contains_key(field), "missing field {field}");
        }
        assert_eq!(value["payload"]["cpu"], 95);
    }

    #[test]
    fn deserializes_without_payload() {
        let alert: Alert = serde_json::from_value(json!({
            "id": "a1",
            "source": "s",
            "event_type": "t",
            "severity": "low",
            "message": "m",
            "timestamp": "2024-05-01T12:00:00"
        }))
        .unwrap();

        assert!(alert.payload.is_empty());
    }
}
