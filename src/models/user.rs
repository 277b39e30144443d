use serde::{Deserialize, Serialize};

/// The relational-store profile row, logically 1:1 with an identity
/// record held by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Tenant pointer; rewritten when tenants are merged
    #[serde(default)]
    pub tenant_id: Option<String>,
}
