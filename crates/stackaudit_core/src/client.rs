use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::{ResolvedConfig, Site};

/// Read-only transport seam for the BookStack JSON API. Reports and the
/// reference index run against this trait; tests substitute an in-memory
/// implementation.
pub trait ApiTransport {
    /// GET `<base>/api/<endpoint>` with the given query pairs and decode the
    /// JSON body. A non-success status is an error and yields no data.
    fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value>;
}

pub struct HttpClient {
    client: Client,
    site: Site,
    auth_header: String,
}

impl HttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            site: config.site.clone(),
            auth_header: format!("Token {}:{}", config.token_id, config.token_secret),
        })
    }
}

impl ApiTransport for HttpClient {
    fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.site.api_url(endpoint);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header.clone())
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .ok()
                .as_ref()
                .and_then(server_error_message)
                .unwrap_or_else(|| "no error message".to_string());
            log::error!("failed to fetch {url}: HTTP {}: {message}", status.as_u16());
            bail!("{url}: HTTP {}: {message}", status.as_u16());
        }

        response
            .json()
            .with_context(|| format!("failed to decode JSON response from {url}"))
    }
}

fn server_error_message(payload: &Value) -> Option<String> {
    payload
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}
