//! Repository-backed implementation of the `AccessService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::db::AccountRepository;
use crate::models::account::{Account, AccountPatch};
use crate::services::access_service::{AccessGrant, AccessService, Denied, DenyReason};

pub struct RepositoryAccessService {
    accounts: Arc<dyn AccountRepository>,
}

impl RepositoryAccessService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    async fn resolve(&self, secret: &str, now_ms: i64) -> Result<Account, DenyReason> {
        if secret.is_empty() {
            return Err(DenyReason::EmptySecret);
        }

        let account = self
            .accounts
            .find_by_connection_secret(secret)
            .await
            .map_err(|e| {
                warn!(error = %e, "Account lookup failed during proxy authentication");
                DenyReason::Repository
            })?
            .ok_or(DenyReason::UnknownSecret)?;

        // Read on every call: a kick may land while sessions are being opened.
        if account.is_denied_at(now_ms) {
            return Err(DenyReason::Kicked);
        }

        Ok(account)
    }
}

#[async_trait]
impl AccessService for RepositoryAccessService {
    async fn authenticate_at(&self, secret: &str, now_ms: i64) -> Result<AccessGrant, Denied> {
        let account = match self.resolve(secret, now_ms).await {
            Ok(account) => account,
            Err(reason) => {
                debug!(reason = reason.as_str(), "Proxy authentication denied");
                metrics::counter!("hysteria2_auth_total", "outcome" => reason.as_str())
                    .increment(1);
                return Err(Denied);
            }
        };

        match self
            .accounts
            .update_fields(account.id, AccountPatch::last_connected(now_ms))
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(account_id = account.id, "Account vanished before last-seen update"),
            Err(e) => warn!(
                account_id = account.id,
                error = %e,
                "Failed to record last connection time"
            ),
        }

        metrics::counter!("hysteria2_auth_total", "outcome" => "granted").increment(1);

        Ok(AccessGrant {
            account_id: account.id,
            username: account.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAccountRepository;
    use anyhow::{Result, bail};

    fn account(id: i64, username: &str, secret: &str) -> Account {
        Account {
            id,
            username: username.to_string(),
            password_hash: String::new(),
            connection_secret: format!("{username}.{secret}"),
            quota: -1,
            upload: 0,
            download: 0,
            expire_at: 0,
            last_connected_at: None,
            denied_until: None,
        }
    }

    fn service(repo: &Arc<InMemoryAccountRepository>) -> RepositoryAccessService {
        RepositoryAccessService::new(repo.clone())
    }

    #[tokio::test]
    async fn test_valid_secret_is_granted_and_recorded() {
        let repo = Arc::new(InMemoryAccountRepository::from_accounts([
            account(1, "alice", "pw1"),
            account(2, "bob", "pw2"),
        ]));

        let grant = service(&repo).authenticate_at("bob.pw2", 5_000).await.unwrap();
        assert_eq!(
            grant,
            AccessGrant {
                account_id: 2,
                username: "bob".to_string()
            }
        );
        assert_eq!(repo.get(2).unwrap().last_connected_at, Some(5_000));
        assert_eq!(repo.get(1).unwrap().last_connected_at, None);
    }

    #[tokio::test]
    async fn test_kick_window_denies_then_expires() {
        let mut kicked = account(1, "alice", "pw");
        kicked.denied_until = Some(10_000);
        let repo = Arc::new(InMemoryAccountRepository::from_accounts([kicked]));
        let svc = service(&repo);

        assert_eq!(svc.authenticate_at("alice.pw", 9_999).await, Err(Denied));
        assert_eq!(repo.get(1).unwrap().last_connected_at, None);

        let grant = svc.authenticate_at("alice.pw", 10_000).await.unwrap();
        assert_eq!(grant.account_id, 1);
        assert_eq!(repo.get(1).unwrap().denied_until, Some(10_000));
    }

    #[tokio::test]
    async fn test_unknown_and_kicked_are_indistinguishable() {
        let mut kicked = account(1, "alice", "pw");
        kicked.denied_until = Some(i64::MAX);
        let repo = Arc::new(InMemoryAccountRepository::from_accounts([kicked]));
        let svc = service(&repo);

        let unknown = svc.authenticate_at("mallory.guess", 0).await;
        let blocked = svc.authenticate_at("alice.pw", 0).await;
        let empty = svc.authenticate_at("", 0).await;

        assert_eq!(unknown, blocked);
        assert_eq!(blocked, empty);
        assert_eq!(unknown.unwrap_err().to_string(), "access denied");
    }

    #[tokio::test]
    async fn test_wall_clock_variant_honours_future_kick() {
        let mut kicked = account(1, "alice", "pw");
        kicked.denied_until = Some(chrono::Utc::now().timestamp_millis() + 60_000);
        let repo = Arc::new(InMemoryAccountRepository::from_accounts([kicked]));

        assert_eq!(service(&repo).authenticate("alice.pw").await, Err(Denied));
    }

    struct ReadOnlyRepository(InMemoryAccountRepository);

    #[async_trait]
    impl AccountRepository for ReadOnlyRepository {
        async fn find_by_connection_secret(&self, secret: &str) -> Result<Option<Account>> {
            self.0.find_by_connection_secret(secret).await
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
            self.0.find_by_id(id).await
        }

        async fn update_fields(&self, _id: i64, _patch: AccountPatch) -> Result<bool> {
            bail!("database is read-only")
        }
    }

    #[tokio::test]
    async fn test_failed_last_seen_write_does_not_deny() {
        let repo = ReadOnlyRepository(InMemoryAccountRepository::from_accounts([account(
            3, "carol", "pw",
        )]));
        let svc = RepositoryAccessService::new(Arc::new(repo));

        let grant = svc.authenticate_at("carol.pw", 1).await.unwrap();
        assert_eq!(grant.username, "carol");
    }

    struct BrokenRepository;

    #[async_trait]
    impl AccountRepository for BrokenRepository {
        async fn find_by_connection_secret(&self, _secret: &str) -> Result<Option<Account>> {
            bail!("connection refused")
        }

        async fn find_by_id(&self, _id: i64) -> Result<Option<Account>> {
            bail!("connection refused")
        }

        async fn update_fields(&self, _id: i64, _patch: AccountPatch) -> Result<bool> {
            bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_repository_failure_is_flattened_to_denied() {
        let svc = RepositoryAccessService::new(Arc::new(BrokenRepository));
        assert_eq!(svc.authenticate_at("alice.pw", 0).await, Err(Denied));
    }
}
