use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One business/company record, the multi-tenant boundary every scoped
/// row points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable, store-assigned id
    pub id: String,
    /// Free-text display name
    pub name: String,
    pub created_at: DateTime<Utc>,
}
