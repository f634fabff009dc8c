// src/osint/sources/geo.rs
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error};

use super::GeoLocator;
use crate::config::Config;
use crate::error::{OsintError, OsintResult};
use crate::osint::model::{GeoInfo, SourceResult};
use crate::utils::http::{endpoint, HttpClient};

/// IP geolocation over a per-IP JSON endpoint (ipapi.co by default)
pub struct GeoLocationClient {
    http: HttpClient,
    endpoint: String,
}

impl GeoLocationClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &Config) -> OsintResult<Self> {
        let http = HttpClient::new(Some(config.global.user_agent.clone()), config.apis.timeout())?;
        Ok(Self::new(http, config.apis.geolocation_url.clone()))
    }

    async fn fetch(&self, ip: &str) -> OsintResult<GeoInfo> {
        let url = endpoint(&self.endpoint, ip)?;

        let (status, body) = self.http
            .get_json(&url)
            .await
            .map_err(|e| OsintError::NetworkError(format!("{:#}", e)))?;

        parse_response(status, &body)
    }
}

#[async_trait]
impl GeoLocator for GeoLocationClient {
    async fn lookup(&self, ip: &str) -> SourceResult<GeoInfo> {
        debug!("Geolocation lookup for {}", ip);

        let result = self.fetch(ip).await;
        if let Err(e) = &result {
            error!("Geolocation error for {}: {}", ip, e);
        }

        result.into()
    }
}

/// Map a provider response onto [`GeoInfo`]. Missing fields stay `None`.
pub(crate) fn parse_response(status: StatusCode, body: &Value) -> OsintResult<GeoInfo> {
    if status != StatusCode::OK {
        return Err(OsintError::ProviderError {
            source_name: "geolocation".to_string(),
            message: format!("HTTP Error: {}", status.as_u16()),
        });
    }

    if !body.is_object() {
        return Err(OsintError::ProviderError {
            source_name: "geolocation".to_string(),
            message: "Invalid JSON response".to_string(),
        });
    }

    if let Some(err) = body.get("error") {
        // ipapi.co sends `"error": true` with the explanation in `reason`
        let message = text_field(body, "reason")
            .or_else(|| err.as_str().map(str::to_string))
            .unwrap_or_else(|| err.to_string());
        return Err(OsintError::ProviderError {
            source_name: "geolocation".to_string(),
            message,
        });
    }

    Ok(GeoInfo {
        ip: text_field(body, "ip"),
        city: text_field(body, "city"),
        region: text_field(body, "region"),
        country: text_field(body, "country_name"),
        postal: text_field(body, "postal"),
        latitude: body.get("latitude").and_then(Value::as_f64),
        longitude: body.get("longitude").and_then(Value::as_f64),
        asn: text_field(body, "asn"),
        org: text_field(body, "org"),
        timezone: text_field(body, "timezone"),
    })
}

/// String or number field as text; null and absent become `None`
pub(crate) fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
