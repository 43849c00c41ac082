//! In-memory account repository.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::AccountRepository;
use crate::models::account::{Account, AccountPatch};

/// Account repository backed by a `HashMap`, keyed by account id.
///
/// Used by tests and by tooling that has no database at hand.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<i64, Account>>,
}

impl InMemoryAccountRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts<I>(accounts: I) -> Self
    where
        I: IntoIterator<Item = Account>,
    {
        let accounts = accounts.into_iter().map(|a| (a.id, a)).collect();
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<Account> {
        self.accounts.read().ok()?.get(&id).cloned()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_connection_secret(&self, secret: &str) -> Result<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| anyhow!("account map lock poisoned"))?;

        Ok(accounts
            .values()
            .find(|a| a.connection_secret == secret)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| anyhow!("account map lock poisoned"))?;

        Ok(accounts.get(&id).cloned())
    }

    async fn update_fields(&self, id: i64, patch: AccountPatch) -> Result<bool> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| anyhow!("account map lock poisoned"))?;

        let Some(account) = accounts.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(username) = patch.username {
            account.username = username;
        }
        if let Some(password_hash) = patch.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(connection_secret) = patch.connection_secret {
            account.connection_secret = connection_secret;
        }
        if let Some(at) = patch.last_connected_at {
            account.last_connected_at = Some(at);
        }
        if let Some(until) = patch.denied_until {
            account.denied_until = until;
        }

        Ok(true)
    }
}
