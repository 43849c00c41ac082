use anyhow::{Context, bail};

use crate::config::Config;
use crate::db::{AccountRepository, Store};
use crate::models::account::AccountPatch;
use crate::services::hash::{connection_secret, random_string, sha224_hex};

pub const BOOTSTRAP_ACCOUNT_ID: i64 = 1;

const CREDENTIAL_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct ResetCredentials {
    pub username: String,
    pub password: String,
    pub connection_secret: String,
}

/// Rotates the bootstrap account to a fresh random username and password.
pub async fn reset_bootstrap_account(
    accounts: &dyn AccountRepository,
) -> anyhow::Result<ResetCredentials> {
    let username = random_string(CREDENTIAL_LEN);
    let password = random_string(CREDENTIAL_LEN);
    let secret = connection_secret(&username, &password);

    let patch = AccountPatch {
        username: Some(username.clone()),
        password_hash: Some(sha224_hex(&password)),
        connection_secret: Some(secret.clone()),
        ..AccountPatch::default()
    };

    let updated = accounts
        .update_fields(BOOTSTRAP_ACCOUNT_ID, patch)
        .await
        .context("Failed to update bootstrap account")?;
    if !updated {
        bail!("Bootstrap account {BOOTSTRAP_ACCOUNT_ID} does not exist");
    }

    Ok(ResetCredentials {
        username,
        password,
        connection_secret: secret,
    })
}

pub async fn cmd_reset(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let accounts = store.accounts();

    let credentials = reset_bootstrap_account(&accounts).await;
    accounts.close().await?;
    let credentials = credentials?;

    println!("Bootstrap account reset.");
    println!("  Username:          {}", credentials.username);
    println!("  Password:          {}", credentials.password);
    println!("  Connection secret: {}", credentials.connection_secret);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAccountRepository;
    use crate::models::account::Account;

    fn bootstrap() -> Account {
        Account {
            id: BOOTSTRAP_ACCOUNT_ID,
            username: "admin".to_string(),
            password_hash: sha224_hex("admin"),
            connection_secret: "admin.admin".to_string(),
            quota: -1,
            upload: 0,
            download: 0,
            expire_at: 0,
            last_connected_at: None,
            denied_until: None,
        }
    }

    #[tokio::test]
    async fn test_reset_rotates_credentials() {
        let repo = InMemoryAccountRepository::from_accounts([bootstrap()]);

        let creds = reset_bootstrap_account(&repo).await.unwrap();
        assert_eq!(creds.username.len(), 6);
        assert_eq!(creds.password.len(), 6);
        assert_eq!(
            creds.connection_secret,
            format!("{}.{}", creds.username, creds.password)
        );

        let stored = repo.get(BOOTSTRAP_ACCOUNT_ID).unwrap();
        assert_eq!(stored.username, creds.username);
        assert_eq!(stored.connection_secret, creds.connection_secret);
        assert_eq!(stored.password_hash, sha224_hex(&creds.password));
        assert_ne!(stored.password_hash, sha224_hex("admin"));
    }

    #[tokio::test]
    async fn test_reset_fails_without_bootstrap_account() {
        let repo = InMemoryAccountRepository::new();
        assert!(reset_bootstrap_account(&repo).await.is_err());
    }
}
