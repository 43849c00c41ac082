use crate::clients::github::GithubReleaseClient;
use crate::config::Config;
use crate::services::ReleaseService;
use std::sync::Arc;

pub async fn cmd_releases(
    config: &Config,
    min_version: Option<&str>,
    asset: Option<&str>,
) -> anyhow::Result<()> {
    let feed = Arc::new(GithubReleaseClient::new(&config.releases)?);
    let service = ReleaseService::new(feed, config.hysteria2.min_version.clone());

    let floor = min_version.unwrap_or(service.default_min_version()).to_string();
    let versions = service.list_compatible(min_version, asset).await?;

    if versions.is_empty() {
        println!("No releases at or above {floor}.");
        return Ok(());
    }

    println!("Compatible releases (>= {floor}):");
    for version in versions {
        println!("  {version}");
    }

    Ok(())
}
