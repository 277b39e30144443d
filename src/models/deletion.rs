use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::store::Value;

/// One row per deletion attempt. The only durable state this subsystem
/// introduces; survives process restarts in the relational store.
///
/// A record is *active* while `cleanup_completed` is false and
/// `restored_at` is unset. At most one active record exists per user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub deleted_at: DateTime<Utc>,
    pub scheduled_cleanup_at: DateTime<Utc>,
    pub cleanup_completed: bool,
    #[serde(default)]
    pub cleanup_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub restored_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: JsonValue,
}

/// Lifecycle state derived from the record's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    PendingDeletion,
    Restored,
    CleanupComplete,
}

impl DeletionRecord {
    pub fn new(
        user_id: &str,
        email: Option<String>,
        now: DateTime<Utc>,
        retention_days: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            email,
            deleted_at: now,
            scheduled_cleanup_at: now + Duration::days(retention_days),
            cleanup_completed: false,
            cleanup_completed_at: None,
            restored_at: None,
            metadata: json!({}),
        }
    }

    pub fn status(&self) -> DeletionStatus {
        if self.cleanup_completed {
            DeletionStatus::CleanupComplete
        } else if self.restored_at.is_some() {
            DeletionStatus::Restored
        } else {
            DeletionStatus::PendingDeletion
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == DeletionStatus::PendingDeletion
    }

    /// Restore is valid only while cleanup has not completed and the
    /// deadline has not passed
    pub fn is_restorable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now < self.scheduled_cleanup_at
    }

    /// Whole days left before the deadline, rounded up
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        let seconds = (self.scheduled_cleanup_at - now).num_seconds();
        if seconds <= 0 {
            0
        } else {
            (seconds + 86_399) / 86_400
        }
    }

    /// Column/value pairs for inserting this record
    pub fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", Value::text(self.id.as_str())),
            ("user_id", Value::text(self.user_id.as_str())),
            (
                "email",
                self.email
                    .as_deref()
                    .map(Value::text)
                    .unwrap_or(Value::Null),
            ),
            ("deleted_at", Value::Timestamp(self.deleted_at)),
            (
                "scheduled_cleanup_at",
                Value::Timestamp(self.scheduled_cleanup_at),
            ),
            ("cleanup_completed", Value::Bool(self.cleanup_completed)),
            (
                "cleanup_completed_at",
                self.cleanup_completed_at
                    .map(Value::Timestamp)
                    .unwrap_or(Value::Null),
            ),
            (
                "restored_at",
                self.restored_at.map(Value::Timestamp).unwrap_or(Value::Null),
            ),
            ("metadata", Value::Json(self.metadata.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(now: DateTime<Utc>) -> DeletionRecord {
        DeletionRecord::new("u1", Some("u1@example.com".to_string()), now, 30)
    }

    #[test]
    fn test_new_record_is_active() {
        let now = Utc::now();
        let record = record_at(now);
        assert_eq!(record.status(), DeletionStatus::PendingDeletion);
        assert!(record.is_active());
        assert_eq!(record.scheduled_cleanup_at, now + Duration::days(30));
    }

    #[test]
    fn test_restorable_window() {
        let now = Utc::now();
        let record = record_at(now);

        // Day 29: restorable
        assert!(record.is_restorable_at(now + Duration::days(29)));
        // Day 31: not restorable
        assert!(!record.is_restorable_at(now + Duration::days(31)));
        // Exactly at the deadline: not restorable
        assert!(!record.is_restorable_at(record.scheduled_cleanup_at));
    }

    #[test]
    fn test_completed_record_is_not_restorable() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.cleanup_completed = true;
        record.cleanup_completed_at = Some(now);
        assert_eq!(record.status(), DeletionStatus::CleanupComplete);
        assert!(!record.is_restorable_at(now));
    }

    #[test]
    fn test_restored_record_is_not_active() {
        let now = Utc::now();
        let mut record = record_at(now);
        record.restored_at = Some(now);
        assert_eq!(record.status(), DeletionStatus::Restored);
        assert!(!record.is_active());
    }

    #[test]
    fn test_days_remaining_rounds_up() {
        let now = Utc::now();
        let record = record_at(now);

        assert_eq!(record.days_remaining_at(now), 30);
        // 29 days and change left rounds up to 30; a clean 29 stays 29
        assert_eq!(record.days_remaining_at(now + Duration::days(1)), 29);
        assert_eq!(
            record.days_remaining_at(now + Duration::days(29) + Duration::hours(1)),
            1
        );
        assert_eq!(record.days_remaining_at(now + Duration::days(31)), 0);
    }
}
