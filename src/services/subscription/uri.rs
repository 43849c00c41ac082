use url::form_urlencoded;

use super::ProxyEndpoint;

/// `hysteria2://<auth>@<host>:<port>/?<params>#<name>`
#[must_use]
pub fn render_hysteria2_url(endpoint: &ProxyEndpoint) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(sni) = &endpoint.sni {
        query.append_pair("sni", sni);
    }
    if endpoint.insecure {
        query.append_pair("insecure", "1");
    }
    if let Some(password) = &endpoint.obfs_password {
        query.append_pair("obfs", "salamander");
        query.append_pair("obfs-password", password);
    }
    let query = query.finish();

    let mut url = format!(
        "hysteria2://{}@{}:{}/",
        urlencoding::encode(&endpoint.auth),
        endpoint.url_host(),
        endpoint.port
    );
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url.push('#');
    url.push_str(&urlencoding::encode(&endpoint.name));
    url
}
