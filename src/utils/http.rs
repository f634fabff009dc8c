// src/utils/http.rs
use std::time::Duration;
use anyhow::{Result, Context};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// HTTP client shared by the JSON-speaking source clients
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: Option<String>, timeout: Duration) -> Result<Self> {
        let user_agent = user_agent.unwrap_or_else(|| format!("osintkit/{}", env!("CARGO_PKG_VERSION")));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(&user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// GET a JSON document, returning the status code alongside the parsed body
    pub async fn get_json(&self, url: &Url) -> Result<(StatusCode, Value)> {
        debug!("GET {}", redact(url));

        let response = self.client
            .get(url.clone())
            .send()
            .await
            .context(format!("Failed to GET {}", redact(url)))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .unwrap_or(Value::Null);

        Ok((status, body))
    }
}

/// Build an endpoint from a template containing an `{ip}` placeholder
pub fn endpoint(template: &str, ip: &str) -> Result<Url> {
    Url::parse(&template.replace("{ip}", ip))
        .context(format!("Invalid endpoint template: {}", template))
}

// API keys travel as query parameters; keep them out of logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
