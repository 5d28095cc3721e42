use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::enums::MonitorKind;
use crate::db::models::Monitor;

/// Body of a check job as it travels through the queue.
///
/// Wire format: `{"monitorId": "...", "type": "http"|"cron", "target": "...", "timestamp": "<ISO-8601>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    pub monitor_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MonitorKind,
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum JobDecodeError {
    #[error("Malformed job payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unknown monitor type: {0}")]
    UnknownKind(String),
}

// The kind is kept as a plain string until after parsing so an unsupported
// type is reported as such rather than as a generic syntax error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJobPayload {
    monitor_id: Uuid,
    #[serde(rename = "type")]
    kind: String,
    target: String,
    timestamp: DateTime<Utc>,
}

impl JobPayload {
    pub fn for_monitor(monitor: &Monitor, now: DateTime<Utc>) -> Self {
        Self {
            monitor_id: monitor.id,
            kind: monitor.monitor_type,
            target: monitor.target.clone(),
            timestamp: now,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(body: &str) -> Result<Self, JobDecodeError> {
        let raw: RawJobPayload = serde_json::from_str(body)?;
        let kind = raw.kind.parse().map_err(JobDecodeError::UnknownKind)?;
        Ok(Self {
            monitor_id: raw.monitor_id,
            kind,
            target: raw.target,
            timestamp: raw.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_wire_field_names() {
        let payload = JobPayload {
            monitor_id: Uuid::nil(),
            kind: MonitorKind::Http,
            target: "https://example.com".to_string(),
            timestamp: "2025-01-01T00:00:00Z".parse().unwrap(),
        };
        let value: serde_json::Value = serde_json::from_str(&payload.encode().unwrap()).unwrap();
        assert_eq!(value["monitorId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["type"], "http");
        assert_eq!(value["target"], "https://example.com");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2025-01-01T00:00:00"));
    }

    #[test]
    fn test_decode_accepts_iso_timestamp_with_millis() {
        let body = r#"{"monitorId":"6f1c2a3e-9a51-4a5e-8d4f-2b6f3b0c9e11","type":"cron","target":"nightly-backup","timestamp":"2025-03-04T05:06:07.890Z"}"#;
        let payload = JobPayload::decode(body).unwrap();
        assert_eq!(payload.kind, MonitorKind::Cron);
        assert_eq!(payload.target, "nightly-backup");
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let body = r#"{"monitorId":"6f1c2a3e-9a51-4a5e-8d4f-2b6f3b0c9e11","type":"ping","target":"1.1.1.1","timestamp":"2025-03-04T05:06:07Z"}"#;
        match JobPayload::decode(body) {
            Err(JobDecodeError::UnknownKind(kind)) => assert_eq!(kind, "ping"),
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            JobPayload::decode("not json"),
            Err(JobDecodeError::Malformed(_))
        ));
        assert!(matches!(
            JobPayload::decode(r#"{"monitorId":"abc","type":"http","target":"x","timestamp":"2025-01-01T00:00:00Z"}"#),
            Err(JobDecodeError::Malformed(_))
        ));
    }
}
