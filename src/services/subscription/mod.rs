//! Renders account state as client-native connection configuration.
//!
//! Clients are grouped into families that share a document or URL schema.
//! The family is picked from the client's declared identity (its
//! `User-Agent`) using [`CLIENT_DETECTION`], evaluated top to bottom.

mod clash;
mod uri;

use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{Hysteria2Config, SubscriptionConfig};
use crate::db::AccountRepository;
use crate::models::account::Account;

pub use clash::render_clash_document;
pub use uri::render_hysteria2_url;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl From<anyhow::Error> for SubscriptionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

impl From<serde_yaml::Error> for SubscriptionError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render(err.to_string())
    }
}

/// Proxy clients grouped by the configuration format they consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientFamily {
    /// Reads Clash-style YAML profiles.
    Shadowrocket,
    /// Clash and its forks: YAML profile with a proxy list.
    Clash,
    /// A single `hysteria2://` URL, base64 encoded.
    V2rayN,
    /// A single plain `hysteria2://` URL.
    NekoBox,
}

/// How a family expects its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    YamlDocument,
    Url,
    Base64Url,
}

/// Identity tokens in priority order. First match wins.
pub const CLIENT_DETECTION: [(&str, ClientFamily); 4] = [
    ("shadowrocket", ClientFamily::Shadowrocket),
    ("clash", ClientFamily::Clash),
    ("v2rayn", ClientFamily::V2rayN),
    ("nekobox", ClientFamily::NekoBox),
];

pub const DEFAULT_CLIENT_FAMILY: ClientFamily = ClientFamily::Clash;

impl ClientFamily {
    /// Maps a client identity string to its family.
    #[must_use]
    pub fn detect(identity: &str) -> Self {
        let identity = identity.to_lowercase();
        CLIENT_DETECTION
            .iter()
            .find(|(token, _)| identity.contains(token))
            .map_or(DEFAULT_CLIENT_FAMILY, |&(_, family)| family)
    }

    #[must_use]
    pub const fn output_format(self) -> OutputFormat {
        match self {
            Self::Shadowrocket | Self::Clash => OutputFormat::YamlDocument,
            Self::V2rayN => OutputFormat::Base64Url,
            Self::NekoBox => OutputFormat::Url,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shadowrocket => "shadowrocket",
            Self::Clash => "clash",
            Self::V2rayN => "v2rayn",
            Self::NekoBox => "nekobox",
        }
    }
}

impl fmt::Display for ClientFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery hints for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Served as a downloadable profile with a refresh hint.
    Attachment {
        filename: String,
        update_interval_hours: u32,
    },
    Inline,
}

#[derive(Debug, Clone)]
pub struct Subscription {
    /// `upload=..; download=..; total=..; expire=..`
    pub user_info: String,
    pub body: String,
    pub delivery: Delivery,
}

/// Everything a client needs to dial the proxy for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub name: String,
    /// Hostname or IP literal, without port or brackets.
    pub host: String,
    pub port: u16,
    pub auth: String,
    pub sni: Option<String>,
    pub insecure: bool,
    pub obfs_password: Option<String>,
    pub up_mbps: Option<u32>,
    pub down_mbps: Option<u32>,
}

impl ProxyEndpoint {
    #[must_use]
    pub fn new(account: &Account, host: String, proxy: &Hysteria2Config) -> Self {
        let name = proxy
            .remark
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| account.username.clone());

        Self {
            name,
            host,
            port: proxy.listen_port,
            auth: account.connection_secret.clone(),
            sni: proxy.sni.clone().filter(|s| !s.is_empty()),
            insecure: proxy.insecure,
            obfs_password: proxy.obfs_password.clone().filter(|s| !s.is_empty()),
            up_mbps: proxy.up_mbps,
            down_mbps: proxy.down_mbps,
        }
    }

    /// Host as it appears in a URL authority.
    #[must_use]
    pub fn url_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

/// Strips any port and IPv6 brackets from a `Host` header value.
pub fn normalize_host(raw: &str) -> Result<String, SubscriptionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SubscriptionError::InvalidInput("Host is empty".to_string()));
    }

    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split_once(']').map_or(rest, |(inner, _)| inner)
    } else if raw.matches(':').count() == 1 {
        raw.split_once(':').map_or(raw, |(name, _)| name)
    } else {
        raw
    };

    if host.is_empty() {
        return Err(SubscriptionError::InvalidInput(format!(
            "Host '{raw}' has no hostname"
        )));
    }

    Ok(host.to_string())
}

pub struct SubscriptionService {
    accounts: Arc<dyn AccountRepository>,
    proxy: Hysteria2Config,
    subscription: SubscriptionConfig,
}

impl SubscriptionService {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        proxy: Hysteria2Config,
        subscription: SubscriptionConfig,
    ) -> Self {
        Self {
            accounts,
            proxy,
            subscription,
        }
    }

    /// Renders the subscription for the account owning `connection_secret`.
    pub async fn build(
        &self,
        connection_secret: &str,
        family: ClientFamily,
        host_header: &str,
    ) -> Result<Subscription, SubscriptionError> {
        let host = normalize_host(host_header)?;

        let account = self
            .accounts
            .find_by_connection_secret(connection_secret)
            .await?
            .ok_or_else(|| {
                SubscriptionError::NotFound("No account matches this subscription".to_string())
            })?;

        debug!(account_id = account.id, family = %family, "Rendering subscription");

        let endpoint = ProxyEndpoint::new(&account, host, &self.proxy);
        let user_info = account.traffic_summary();

        let (body, delivery) = match family.output_format() {
            OutputFormat::YamlDocument => (
                render_clash_document(&endpoint)?,
                Delivery::Attachment {
                    filename: self.subscription.filename.clone(),
                    update_interval_hours: self.subscription.update_interval_hours,
                },
            ),
            OutputFormat::Url => (render_hysteria2_url(&endpoint), Delivery::Inline),
            OutputFormat::Base64Url => (
                STANDARD.encode(render_hysteria2_url(&endpoint)),
                Delivery::Inline,
            ),
        };

        Ok(Subscription {
            user_info,
            body,
            delivery,
        })
    }

    /// The plain `hysteria2://` URL for an account, addressed by id.
    pub async fn connection_url(
        &self,
        account_id: i64,
        hostname: &str,
    ) -> Result<String, SubscriptionError> {
        let host = normalize_host(hostname)?;
        let account = self.account_by_id(account_id).await?;
        Ok(render_hysteria2_url(&ProxyEndpoint::new(
            &account,
            host,
            &self.proxy,
        )))
    }

    /// The URL clients poll for their subscription, e.g.
    /// `https://panel.example.com/hui/alice.secret`.
    pub async fn subscribe_url(
        &self,
        account_id: i64,
        protocol: &str,
        host: &str,
    ) -> Result<String, SubscriptionError> {
        let protocol = protocol.trim().to_ascii_lowercase();
        if protocol != "http" && protocol != "https" {
            return Err(SubscriptionError::InvalidInput(format!(
                "Unsupported protocol '{protocol}', expected http or https"
            )));
        }

        let host = host.trim();
        if host.is_empty() {
            return Err(SubscriptionError::InvalidInput("Host is empty".to_string()));
        }

        let account = self.account_by_id(account_id).await?;
        Ok(format!(
            "{protocol}://{host}/hui/{}",
            urlencoding::encode(&account.connection_secret)
        ))
    }

    async fn account_by_id(&self, account_id: i64) -> Result<Account, SubscriptionError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| SubscriptionError::NotFound(format!("Account {account_id} not found")))
    }
}
