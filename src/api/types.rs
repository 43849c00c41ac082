use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Body the proxy server posts for every new session.
#[derive(Debug, Default, Deserialize)]
pub struct Hysteria2AuthRequest {
    #[serde(default)]
    pub addr: String,
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub tx: u64,
}

/// Reply to the proxy server. Always sent with HTTP 200.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hysteria2AuthResponse {
    pub ok: bool,
    pub id: String,
}

impl Hysteria2AuthResponse {
    #[must_use]
    pub fn granted(username: String) -> Self {
        Self { ok: true, id: username }
    }

    #[must_use]
    pub fn denied() -> Self {
        Self {
            ok: false,
            id: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct KickRequest {
    pub ids: Vec<i64>,
    /// Unix milliseconds.
    pub kick_until: i64,
}

#[derive(Debug, Serialize)]
pub struct KickResponse {
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseQuery {
    pub min_version: Option<String>,
    pub asset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseListResponse {
    pub min_version: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionUrlRequest {
    pub account_id: i64,
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeUrlRequest {
    pub account_id: i64,
    pub protocol: String,
    pub host: String,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
    pub uptime_seconds: u64,
}
