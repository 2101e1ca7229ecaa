//! Shared alert types for the AlertHub server.
//!
//! This module defines the core data structure flowing through the broker.
//! Alerts are immutable once created and follow the JSON schema producers
//! post to `POST /alert`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single alert emitted by a producer.
///
/// Field names are serialized as `snake_case` to match the ingestion API
/// contract. Every field except `payload` is required; deserialization fails
/// (and the request is rejected at the HTTP boundary) if any is missing or has
/// the wrong JSON type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Producer-generated unique identifier (UUID v4 by convention).
    pub id: String,

    /// Free-text identifier of the producing entity.
    pub source: String,

    /// Category of the alert, e.g. `cpu_high`.
    pub event_type: String,

    /// Severity label, e.g. `low`, `medium`, `high`. Display only.
    pub severity: String,

    /// Human-readable description.
    pub message: String,

    /// Creation time as sent by the producer.
    ///
    /// Agents send `YYYY-MM-DDTHH:MM:SS` in UTC, but the broker never
    /// interprets this value; any string is stored and forwarded verbatim.
    pub timestamp: String,

    /// Arbitrary structured data attached by the producer.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Alert {
    /// Returns the one-line summary used for escalation messages.
    ///
    /// Format: `[SEVERITY] event_type - message`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use alerthub_server::types::Alert;
    ///
    /// let alert: Alert = serde_json::from_str(r#"{
    ///     "id": "a1", "source": "node-1", "event_type": "cpu_high",
    ///     "severity": "high", "message": "CPU 95%",
    ///     "timestamp": "2024-05-01T12:00:00"
    /// }"#).unwrap();
    ///
    /// assert_eq!(alert.summary(), "[HIGH] cpu_high - CPU 95%");
    /// ```
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} - {}",
            self.severity.to_uppercase(),
            self.event_type,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> Value {
        json!({
            "id": "3f1c9a8e-0000-4000-8000-000000000001",
            "source": "node-1",
            "event_type": "cpu_high",
            "severity": "high",
            "message": "CPU 95%",
            "timestamp": "2024-05-01T12:30:45",
            "payload": { "cpu": 95, "host": "node-1" }
        })
    }

    #[test]
    fn deserializes_full_alert() {
        let alert: Alert = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(alert.event_type, "cpu_high");
        assert_eq!(alert.payload["cpu"], 95);
        assert_eq!(alert.timestamp, "2024-05-01T12:30:45");
    }

    #[test]
    fn payload_defaults_to_empty() {
        let mut value = sample_json();
        value.as_object_mut().unwrap().remove("payload");

        let alert: Alert = serde_json::from_value(value).unwrap();
        assert!(alert.payload.is_empty());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        for field in ["id", "source", "event_type", "severity", "message", "timestamp"] {
            let mut value = sample_json();
            value.as_object_mut().unwrap().remove(field);
            assert!(
                serde_json::from_value::<Alert>(value).is_err(),
                "alert without '{field}' should be rejected"
            );
        }
    }

    #[test]
    fn wrong_field_type_is_rejected() {
        let mut value = sample_json();
        value["severity"] = json!(3);
        assert!(serde_json::from_value::<Alert>(value).is_err());

        let mut value = sample_json();
        value["payload"] = json!(["not", "a", "map"]);
        assert!(serde_json::from_value::<Alert>(value).is_err());
    }

    #[test]
    fn non_string_timestamp_is_rejected() {
        let mut value = sample_json();
        value["timestamp"] = json!(1714566645);
        assert!(serde_json::from_value::<Alert>(value).is_err());
    }

    #[test]
    fn timestamp_round_trips_verbatim() {
        for raw in [
            "2024-05-01T12:30:45.123456",
            "2024-05-01T12:30:45Z",
            "2024-05-01T12:30:45+02:00",
            "2024-05-01 12:30:45",
        ] {
            let mut value = sample_json();
            value["timestamp"] = json!(raw);

            let alert: Alert = serde_json::from_value(value).unwrap();
            let out = serde_json::to_value(&alert).unwrap();
            assert_eq!(out["timestamp"], raw);
        }
    }

    #[test]
    fn summary_uppercases_severity() {
        let mut alert: Alert = serde_json::from_value(sample_json()).unwrap();
        alert.severity = "medium".to_string();
        alert.message = "Disk 80%".to_string();
        alert.event_type = "disk_usage".to_string();

        assert_eq!(alert.summary(), "[MEDIUM] disk_usage - Disk 80%");
    }
}
