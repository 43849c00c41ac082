use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entities::accounts;
use crate::models::account::{Account, AccountPatch};

/// Point lookups and partial updates over account records.
///
/// Implementations must guarantee that a connection secret maps to at most
/// one account.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_connection_secret(&self, secret: &str) -> Result<Option<Account>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Applies `patch` to account `id`. Returns `false` when no such account exists.
    async fn update_fields(&self, id: i64, patch: AccountPatch) -> Result<bool>;

    /// Releases any resources held by the repository. Clones sharing the
    /// same pool become unusable.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub struct SeaOrmAccountRepository {
    conn: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AccountRepository for SeaOrmAccountRepository {
    async fn find_by_connection_secret(&self, secret: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::ConnectionSecret.eq(secret))
            .one(&self.conn)
            .await
            .context("Failed to query account by connection secret")?;

        Ok(account.map(Account::from))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    async fn update_fields(&self, id: i64, patch: AccountPatch) -> Result<bool> {
        let Some(account) = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for update")?
        else {
            return Ok(false);
        };

        if patch.is_empty() {
            return Ok(true);
        }

        let mut active: accounts::ActiveModel = account.into();
        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(password_hash) = patch.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(connection_secret) = patch.connection_secret {
            active.connection_secret = Set(connection_secret);
        }
        if let Some(at) = patch.last_connected_at {
            active.last_connected_at = Set(Some(at));
        }
        if let Some(until) = patch.denied_until {
            active.denied_until = Set(until);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .with_context(|| format!("Failed to update account {id}"))?;

        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.conn
            .clone()
            .close()
            .await
            .context("Failed to close account repository")?;
        info!("Database connection closed");
        Ok(())
    }
}
