use serde::{Serialize, Deserialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub apis: ApiConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Global application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            user_agent: default_user_agent(),
        }
    }
}

/// External service settings shared by the source clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Per-call timeout in seconds, applied to HTTP, DNS and WHOIS queries
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Shodan API key; empty disables host intelligence
    #[serde(default)]
    pub shodan_key: String,

    /// Geolocation endpoint, `{ip}` is substituted
    #[serde(default = "default_geolocation_url")]
    pub geolocation_url: String,

    #[serde(default = "default_shodan_url")]
    pub shodan_url: String,

    /// Nameserver IP used instead of the system resolver configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameserver: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            shodan_key: String::new(),
            geolocation_url: default_geolocation_url(),
            shodan_url: default_shodan_url(),
            nameserver: None,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_exports_dir")]
    pub exports: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            exports: default_exports_dir(),
        }
    }
}

/// Orchestration behaviour
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    /// Issue independent source calls concurrently
    #[serde(default)]
    pub parallel: bool,

    /// Upper bound for each fan-out phase, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".osintkit/data")
}

fn default_user_agent() -> String {
    format!("osintkit/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_geolocation_url() -> String {
    "https://ipapi.co/{ip}/json/".to_string()
}

fn default_shodan_url() -> String {
    "https://api.shodan.io/shodan/host/{ip}".to_string()
}

fn default_exports_dir() -> PathBuf {
    PathBuf::from("./exports")
}
