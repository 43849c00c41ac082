use serde::{Deserialize, Serialize};

use crate::entities::accounts;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub connection_secret: String,
    pub quota: i64,
    pub upload: i64,
    pub download: i64,
    pub expire_at: i64,
    pub last_connected_at: Option<i64>,
    pub denied_until: Option<i64>,
}

impl Account {
    /// Whether a kick window is still open at `now_ms`.
    #[must_use]
    pub fn is_denied_at(&self, now_ms: i64) -> bool {
        self.denied_until.is_some_and(|until| now_ms < until)
    }

    /// The `subscription-userinfo` line understood by Clash-style clients.
    #[must_use]
    pub fn traffic_summary(&self) -> String {
        format!(
            "upload={}; download={}; total={}; expire={}",
            self.upload,
            self.download,
            self.quota,
            self.expire_at / 1000
        )
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            connection_secret: model.connection_secret,
            quota: model.quota,
            upload: model.upload,
            download: model.download,
            expire_at: model.expire_at,
            last_connected_at: model.last_connected_at,
            denied_until: model.denied_until,
        }
    }
}

/// Partial update applied by [`crate::db::AccountRepository::update_fields`].
///
/// `None` leaves a column untouched. `denied_until: Some(None)` clears a kick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub connection_secret: Option<String>,
    pub last_connected_at: Option<i64>,
    pub denied_until: Option<Option<i64>>,
}

impl AccountPatch {
    #[must_use]
    pub fn last_connected(at_ms: i64) -> Self {
        Self {
            last_connected_at: Some(at_ms),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn denied_until(until_ms: i64) -> Self {
        Self {
            denied_until: Some(Some(until_ms)),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.password_hash.is_none()
            && self.connection_secret.is_none()
            && self.last_connected_at.is_none()
            && self.denied_until.is_none()
    }
}
