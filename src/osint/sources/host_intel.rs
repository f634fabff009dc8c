// src/osint/sources/host_intel.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{error, info, warn};

use super::geo::text_field;
use super::{HostIntelLookup, HOST_INTEL_UNAVAILABLE};
use crate::config::Config;
use crate::error::{OsintError, OsintResult};
use crate::osint::model::{HostIntel, SourceResult};
use crate::utils::http::{endpoint, HttpClient};

/// Shodan host lookups. Disabled without an API key or without the `shodan` feature.
pub struct ShodanClient {
    http: HttpClient,
    endpoint: String,
    api_key: String,
    available: bool,
}

impl ShodanClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let available = cfg!(feature = "shodan") && !api_key.trim().is_empty();

        if available {
            info!("Shodan API initialized");
        } else if !api_key.trim().is_empty() {
            warn!("Shodan API key configured but support was not compiled in");
        }

        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
            available,
        }
    }

    pub fn from_config(config: &Config) -> OsintResult<Self> {
        let http = HttpClient::new(Some(config.global.user_agent.clone()), config.apis.timeout())?;
        Ok(Self::new(http, config.apis.shodan_url.clone(), config.apis.shodan_key.clone()))
    }

    async fn fetch(&self, ip: &str) -> OsintResult<HostIntel> {
        let mut url = endpoint(&self.endpoint, ip)?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let (status, body) = self.http
            .get_json(&url)
            .await
            .map_err(|e| OsintError::NetworkError(format!("{:#}", e)))?;

        parse_host(ip, status, &body)
    }
}

#[async_trait]
impl HostIntelLookup for ShodanClient {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn lookup_ip(&self, ip: &str) -> SourceResult<HostIntel> {
        if !self.available {
            return SourceResult::failed(HOST_INTEL_UNAVAILABLE);
        }

        let result = self.fetch(ip).await;
        if let Err(e) = &result {
            error!("Shodan API error for {}: {}", ip, e);
        }

        result.into()
    }
}

pub(crate) fn parse_host(ip: &str, status: StatusCode, body: &Value) -> OsintResult<HostIntel> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        return Err(OsintError::ProviderError {
            source_name: "shodan".to_string(),
            message: message.to_string(),
        });
    }

    if !status.is_success() {
        return Err(OsintError::ProviderError {
            source_name: "shodan".to_string(),
            message: format!("HTTP Error: {}", status.as_u16()),
        });
    }

    Ok(HostIntel {
        ip: ip.to_string(),
        hostnames: string_list(body.get("hostnames")),
        country: text_field(body, "country_name"),
        city: text_field(body, "city"),
        org: text_field(body, "org"),
        isp: text_field(body, "isp"),
        asn: text_field(body, "asn"),
        os: text_field(body, "os"),
        ports: body
            .get("ports")
            .and_then(Value::as_array)
            .map(|ports| {
                ports.iter()
                    .filter_map(Value::as_u64)
                    .filter_map(|p| u16::try_from(p).ok())
                    .collect()
            })
            .unwrap_or_default(),
        vulns: string_list(body.get("vulns")),
        last_update: text_field(body, "last_update"),
        tags: string_list(body.get("tags")),
    })
}

// Shodan returns some collections as arrays and others as objects keyed by id
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}
