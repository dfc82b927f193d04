use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State persisted between the two validation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_data: Value,
    pub liveness_pid: String,
    #[serde(rename = "expires")]
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Display name of the validated person, when the workflow supplied one.
    pub fn display_name(&self) -> Option<&str> {
        self.user_data.get("nome").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn expires_at_the_boundary() {
        let now = Utc::now();
        let record = SessionRecord {
            user_data: json!({}),
            liveness_pid: "p1".to_string(),
            expires_at: now,
        };

        assert!(record.is_expired_at(now));
        assert!(!record.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn serializes_expiry_as_iso_timestamp() {
        let record = SessionRecord {
            user_data: json!({"nome": "Ana"}),
            liveness_pid: "p1".to_string(),
            expires_at: "2026-10-17T12:00:00Z".parse().unwrap(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["expires"], "2026-10-17T12:00:00Z");
        assert_eq!(value["liveness_pid"], "p1");
        assert_eq!(record.display_name(), Some("Ana"));
    }

    #[test]
    fn display_name_requires_a_string() {
        let record = SessionRecord {
            user_data: json!({"nome": 42}),
            liveness_pid: "p1".to_string(),
            expires_at: Utc::now(),
        };

        assert_eq!(record.display_name(), None);
    }
}
