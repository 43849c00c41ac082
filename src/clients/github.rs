use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::debug;
use url::Url;

use crate::config::ReleasesConfig;
use crate::models::release::Release;

const USER_AGENT: &str = concat!("hy2-admin/", env!("CARGO_PKG_VERSION"));

/// Source of published proxy-server releases, newest first.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    /// One bounded fetch. Retrying is left to the caller.
    async fn list_releases(&self) -> Result<Vec<Release>>;
}

#[derive(Debug, Clone)]
pub struct GithubReleaseClient {
    client: Client,
    releases_url: Url,
}

impl GithubReleaseClient {
    pub fn new(config: &ReleasesConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client for release feed")?;

        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &ReleasesConfig) -> Result<Self> {
        let releases_url = Self::releases_url(&config.api_base_url, &config.owner, &config.repo)?;
        Ok(Self {
            client,
            releases_url,
        })
    }

    fn releases_url(base: &str, owner: &str, repo: &str) -> Result<Url> {
        let mut url = Url::parse(base)
            .with_context(|| format!("Invalid release API base URL: {base}"))?;

        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Release API base URL cannot be a base: {base}"))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "releases"]);

        url.query_pairs_mut().append_pair("per_page", "100");

        Ok(url)
    }
}

#[async_trait]
impl ReleaseFeed for GithubReleaseClient {
    async fn list_releases(&self) -> Result<Vec<Release>> {
        debug!(url = %self.releases_url, "Fetching release feed");

        let response = self
            .client
            .get(self.releases_url.clone())
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .context("Failed to reach release feed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Release feed returned {status}: {body}");
        }

        let releases: Vec<Release> = response
            .json()
            .await
            .context("Failed to decode release feed")?;

        debug!(count = releases.len(), "Fetched release feed");
        Ok(releases)
    }
}
