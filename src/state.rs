use std::sync::Arc;

use crate::clients::github::{GithubReleaseClient, ReleaseFeed};
use crate::config::Config;
use crate::db::{AccountRepository, Store};
use crate::services::{
    AccessService, KickService, ReleaseService, RepositoryAccessService, SubscriptionService,
};

/// Shared HTTP client for outbound calls. Reused so connections are pooled.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("hy2-admin/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub accounts: Arc<dyn AccountRepository>,

    pub access_service: Arc<dyn AccessService>,

    pub kick_service: Arc<KickService>,

    pub subscription_service: Arc<SubscriptionService>,

    pub release_service: Arc<ReleaseService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.releases.request_timeout_seconds)?;
        let feed: Arc<dyn ReleaseFeed> = Arc::new(GithubReleaseClient::with_client(
            http_client,
            &config.releases,
        )?);

        Ok(Self::with_parts(config, store, feed))
    }

    /// Wires services over an open store and an arbitrary release feed.
    #[must_use]
    pub fn with_parts(config: Config, store: Store, feed: Arc<dyn ReleaseFeed>) -> Self {
        let accounts: Arc<dyn AccountRepository> = Arc::new(store.accounts());

        let access_service =
            Arc::new(RepositoryAccessService::new(accounts.clone())) as Arc<dyn AccessService>;
        let kick_service = Arc::new(KickService::new(accounts.clone()));
        let subscription_service = Arc::new(SubscriptionService::new(
            accounts.clone(),
            config.hysteria2.clone(),
            config.subscription.clone(),
        ));
        let release_service = Arc::new(ReleaseService::new(
            feed,
            config.hysteria2.min_version.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            accounts,
            access_service,
            kick_service,
            subscription_service,
            release_service,
        }
    }
}
