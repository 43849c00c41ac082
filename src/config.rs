use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub hysteria2: Hysteria2Config,

    pub subscription: SubscriptionConfig,

    pub releases: ReleasesConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/hy2-admin.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Operator API key. Operator routes reject every request while unset.
    pub api_key: Option<String>,

    /// Minimum wall time of an auth callback response, so that accepted and
    /// rejected credentials cannot be told apart by latency.
    pub auth_min_response_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            cors_allowed_origins: vec![
                "http://localhost:8081".to_string(),
                "http://127.0.0.1:8081".to_string(),
            ],
            api_key: None,
            auth_min_response_ms: 50,
        }
    }
}

/// Settings of the proxy server that subscriptions point clients at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hysteria2Config {
    pub listen_port: u16,

    pub sni: Option<String>,

    pub insecure: bool,

    /// Enables salamander obfuscation when set.
    pub obfs_password: Option<String>,

    pub up_mbps: Option<u32>,

    pub down_mbps: Option<u32>,

    /// Display name for the proxy entry. Falls back to the account username.
    pub remark: Option<String>,

    /// Oldest server release offered by the release listing.
    pub min_version: String,
}

impl Default for Hysteria2Config {
    fn default() -> Self {
        Self {
            listen_port: 443,
            sni: None,
            insecure: false,
            obfs_password: None,
            up_mbps: None,
            down_mbps: None,
            remark: None,
            min_version: "2.4.4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    pub filename: String,

    pub update_interval_hours: u32,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            filename: "hui.yaml".to_string(),
            update_interval_hours: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasesConfig {
    pub api_base_url: String,

    pub owner: String,

    pub repo: String,

    pub request_timeout_seconds: u64,
}

impl Default for ReleasesConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            owner: "apernet".to_string(),
            repo: "hysteria".to_string(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "hy2-admin".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("hy2-admin").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hy2-admin").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.hysteria2.listen_port == 0 {
            anyhow::bail!("Hysteria2 listen port must be > 0");
        }

        self.hysteria2
            .min_version
            .parse::<crate::services::release::SemVer>()
            .with_context(|| format!("Invalid min_version '{}'", self.hysteria2.min_version))?;

        if self.subscription.filename.trim().is_empty() {
            anyhow::bail!("Subscription filename cannot be empty");
        }

        if self.releases.request_timeout_seconds == 0 {
            anyhow::bail!("Release request timeout must be > 0");
        }

        if self.server.api_key.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("Server API key cannot be an empty string");
        }

        Ok(())
    }
}
