//! Identity provider contract.
//!
//! Only three behaviors of the provider are consumed: delete an identity,
//! list identities, and "identity does not exist" counting as success for
//! a delete. Everything else about authentication stays with the provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::constants::IDENTITY_REQUEST_TIMEOUT_SECS;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a delete call; an identity that was already gone is success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityDeletion {
    Deleted,
    AlreadyAbsent,
}

/// An authentication record as reported by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn delete_identity(&self, user_id: &str) -> Result<IdentityDeletion, IdentityError>;

    async fn list_identities(&self) -> Result<Vec<Identity>, IdentityError>;
}

// =============================================================================
// HTTP implementation (provider admin API)
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListIdentitiesResponse {
    users: Vec<Identity>,
}

/// Client for the identity provider's admin API (bearer service key)
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, service_key: &str) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(IDENTITY_REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn delete_identity(&self, user_id: &str) -> Result<IdentityDeletion, IdentityError> {
        let url = format!("{}/admin/users/{}", self.base_url, user_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(IdentityDeletion::Deleted)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            // Already removed by an earlier attempt; deletion is idempotent
            Ok(IdentityDeletion::AlreadyAbsent)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(IdentityError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, IdentityError> {
        let url = format!("{}/admin/users", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ListIdentitiesResponse = response.json().await?;
        Ok(parsed.users)
    }
}

// =============================================================================
// In-memory implementation (tests and local development)
// =============================================================================

#[derive(Default)]
pub struct MemIdentityProvider {
    identities: Mutex<HashMap<String, Identity>>,
    fail_ids: Mutex<HashSet<String>>,
}

impl MemIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: &str, email: Option<&str>) {
        if let Ok(mut identities) = self.identities.lock() {
            identities.insert(
                id.to_string(),
                Identity {
                    id: id.to_string(),
                    email: email.map(|e| e.to_string()),
                    created_at: Some(Utc::now()),
                },
            );
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.identities
            .lock()
            .map(|identities| identities.contains_key(id))
            .unwrap_or(false)
    }

    /// Make delete calls for `id` fail until cleared
    pub fn fail_delete(&self, id: &str) {
        if let Ok(mut fail_ids) = self.fail_ids.lock() {
            fail_ids.insert(id.to_string());
        }
    }

    pub fn clear_failure(&self, id: &str) {
        if let Ok(mut fail_ids) = self.fail_ids.lock() {
            fail_ids.remove(id);
        }
    }
}

#[async_trait]
impl IdentityProvider for MemIdentityProvider {
    async fn delete_identity(&self, user_id: &str) -> Result<IdentityDeletion, IdentityError> {
        let failing = self
            .fail_ids
            .lock()
            .map(|ids| ids.contains(user_id))
            .unwrap_or(false);
        if failing {
            return Err(IdentityError::Unavailable(format!(
                "injected failure for {user_id}"
            )));
        }

        let removed = self
            .identities
            .lock()
            .map(|mut identities| identities.remove(user_id).is_some())
            .unwrap_or(false);
        if removed {
            Ok(IdentityDeletion::Deleted)
        } else {
            Ok(IdentityDeletion::AlreadyAbsent)
        }
    }

    async fn list_identities(&self) -> Result<Vec<Identity>, IdentityError> {
        let mut identities: Vec<Identity> = self
            .identities
            .lock()
            .map(|identities| identities.values().cloned().collect())
            .unwrap_or_default();
        identities.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(identities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let provider = MemIdentityProvider::new();
        provider.add("u1", Some("u1@example.com"));

        assert_eq!(
            provider.delete_identity("u1").await.unwrap(),
            IdentityDeletion::Deleted
        );
        assert_eq!(
            provider.delete_identity("u1").await.unwrap(),
            IdentityDeletion::AlreadyAbsent
        );
    }
}
