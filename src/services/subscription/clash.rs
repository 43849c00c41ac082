use serde::Serialize;

use super::{ProxyEndpoint, SubscriptionError};

const PROXY_GROUP: &str = "PROXY";

#[derive(Debug, Serialize)]
struct ClashDocument<'a> {
    proxies: Vec<ClashProxy<'a>>,
    #[serde(rename = "proxy-groups")]
    proxy_groups: Vec<ClashProxyGroup<'a>>,
    rules: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashProxy<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    server: &'a str,
    port: u16,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sni: Option<&'a str>,
    skip_cert_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    obfs: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    obfs_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    down: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClashProxyGroup<'a> {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    proxies: Vec<&'a str>,
}

/// Clash-schema YAML profile with a single hysteria2 proxy.
pub fn render_clash_document(endpoint: &ProxyEndpoint) -> Result<String, SubscriptionError> {
    let proxy = ClashProxy {
        name: &endpoint.name,
        kind: "hysteria2",
        server: &endpoint.host,
        port: endpoint.port,
        password: &endpoint.auth,
        sni: endpoint.sni.as_deref(),
        skip_cert_verify: endpoint.insecure,
        obfs: endpoint.obfs_password.as_ref().map(|_| "salamander"),
        obfs_password: endpoint.obfs_password.as_deref(),
        up: endpoint.up_mbps.map(|m| format!("{m} Mbps")),
        down: endpoint.down_mbps.map(|m| format!("{m} Mbps")),
    };

    let document = ClashDocument {
        proxies: vec![proxy],
        proxy_groups: vec![ClashProxyGroup {
            name: PROXY_GROUP,
            kind: "select",
            proxies: vec![&endpoint.name],
        }],
        rules: vec![format!("MATCH,{PROXY_GROUP}")],
    };

    Ok(serde_yaml::to_string(&document)?)
}
