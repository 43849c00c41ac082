//! Domain service for proxy-session authentication.
//!
//! The data-plane process calls this for every new session. Every failure
//! collapses into [`Denied`] so the caller learns nothing about the cause.

use serde::Serialize;
use thiserror::Error;

/// Successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    pub account_id: i64,
    /// Display label for the proxy's own session accounting.
    pub username: String,
}

/// The single failure outcome of [`AccessService::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied")]
pub struct Denied;

/// Why a request was denied. Logged and counted, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    EmptySecret,
    UnknownSecret,
    Kicked,
    Repository,
}

impl DenyReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptySecret => "empty_secret",
            Self::UnknownSecret => "unknown_secret",
            Self::Kicked => "kicked",
            Self::Repository => "repository_error",
        }
    }
}

#[async_trait::async_trait]
pub trait AccessService: Send + Sync {
    /// Validates `secret` as of `now_ms` (unix milliseconds).
    ///
    /// On success the account's last-connected time is set to `now_ms`
    /// before returning; a failed write does not change the outcome.
    async fn authenticate_at(&self, secret: &str, now_ms: i64) -> Result<AccessGrant, Denied>;

    /// Validates `secret` against the current wall clock.
    async fn authenticate(&self, secret: &str) -> Result<AccessGrant, Denied> {
        self.authenticate_at(secret, chrono::Utc::now().timestamp_millis())
            .await
    }
}
