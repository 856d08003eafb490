//! Audit log sink
//!
//! Fire-and-forget: records are written on a spawned task and failures are
//! only logged. Callers never wait on or observe the write.

use crate::auth::{Claims, Role};
use crate::db::{to_row, SharedGateway};
use crate::table::{Column, TableSpec};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

pub const AUDIT_TABLE: &str = "audit_logs";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Account actions
    ProfileRegistered,
    RoleChanged,

    // Booking flow
    BookingCreated,
    BookingUpdated,
    BookingDeleted,
    PaymentCreated,
    PaymentUpdated,

    // Content & operations
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    CenterArchived,
    MediaUploaded,
    MediaDeleted,

    // Configuration
    SettingChanged,
    SettingsRefreshed,
}

/// Audit details are free-form: structured JSON or a plain message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AuditDetails {
    Json(Value),
    Text(String),
}

impl From<Value> for AuditDetails {
    fn from(value: Value) -> Self {
        AuditDetails::Json(value)
    }
}

impl From<&str> for AuditDetails {
    fn from(text: &str) -> Self {
        AuditDetails::Text(text.to_string())
    }
}

impl From<String> for AuditDetails {
    fn from(text: String) -> Self {
        AuditDetails::Text(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub details: AuditDetails,
    pub user_id: Option<Uuid>,
    pub user_role: Option<Role>,
    #[serde(serialize_with = "fixed_width")]
    pub timestamp: DateTime<Utc>,
}

/// Always six fractional digits so stored timestamps sort as text
fn fixed_width<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Columns for the admin audit table
pub fn audit_table_spec() -> TableSpec {
    TableSpec::new(vec![
        Column::new("timestamp", "Time"),
        Column::new("action", "Action"),
        Column::new("user_role", "Role"),
        Column::new("user_id", "User"),
        Column::new("details", "Details").unsortable(),
    ])
    .filter_keys(["action", "user_role"])
}

#[derive(Clone)]
pub struct AuditLog {
    gateway: SharedGateway,
}

impl AuditLog {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Record an action performed by `actor`
    pub fn record(&self, action: AuditAction, details: impl Into<AuditDetails>, actor: Option<&Claims>) {
        self.write(AuditEntry {
            action,
            details: details.into(),
            user_id: actor.map(|c| c.sub),
            user_role: actor.map(|c| c.role),
            timestamp: Utc::now(),
        });
    }

    /// Spawn the write; errors are swallowed
    pub fn write(&self, entry: AuditEntry) {
        let gateway = self.gateway.clone();
        tokio::spawn(async move {
            let row = match to_row(&entry) {
                Ok(row) => row,
                Err(e) => {
                    warn!("Audit entry could not be encoded: {}", e);
                    return;
                }
            };
            match gateway.insert(AUDIT_TABLE, row).await {
                Ok(_) => debug!("Audit {:?} recorded", entry.action),
                Err(e) => warn!("Audit log write failed (ignored): {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryGateway, Query};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn entry_at(timestamp: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            action: AuditAction::SettingsRefreshed,
            details: AuditDetails::from("reload"),
            user_id: None,
            user_role: None,
            timestamp,
        }
    }

    #[test]
    fn test_details_serialize_untagged() {
        assert_eq!(
            serde_json::to_value(AuditDetails::from("plain note")).unwrap(),
            json!("plain note")
        );
        assert_eq!(
            serde_json::to_value(AuditDetails::from(json!({ "id": 7 }))).unwrap(),
            json!({ "id": 7 })
        );
    }

    #[tokio::test]
    async fn test_record_is_written_in_background() {
        let gateway: SharedGateway = Arc::new(MemoryGateway::new());
        let audit = AuditLog::new(gateway.clone());

        audit.record(AuditAction::SettingChanged, json!({ "key": "site_name" }), None);

        let mut rows = Vec::new();
        for _ in 0..50 {
            rows = gateway.select(&Query::table(AUDIT_TABLE)).await.unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["action"], json!("setting_changed"));
        assert_eq!(rows[0]["details"]["key"], json!("site_name"));
        assert_eq!(rows[0]["user_id"], Value::Null);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let whole = Utc.with_ymd_and_hms(2030, 3, 1, 10, 0, 5).unwrap();
        let later = whole + chrono::Duration::milliseconds(1);

        let whole_text = serde_json::to_value(entry_at(whole)).unwrap()["timestamp"].clone();
        let later_text = serde_json::to_value(entry_at(later)).unwrap()["timestamp"].clone();
        assert_eq!(whole_text, json!("2030-03-01T10:00:05.000000Z"));
        assert_eq!(later_text, json!("2030-03-01T10:00:05.001000Z"));
        assert!(whole_text.as_str() < later_text.as_str());

        let back: AuditEntry = serde_json::from_value(serde_json::to_value(entry_at(later)).unwrap()).unwrap();
        assert_eq!(back.timestamp, later);
    }
}
