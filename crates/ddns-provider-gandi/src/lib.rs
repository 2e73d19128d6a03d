// # Gandi LiveDNS Provider
//
// This crate implements `DnsUpdateClient` against the Gandi LiveDNS v5 API.
//
// ## Scope
//
// - One PUT per call, replacing the whole A rrset of the managed record
// - Errors propagate to the engine, which owns retries and backoff
// - Dry-run mode logs the request instead of sending it
// - No caching, no background tasks
//
// ## Security Requirements
//
// - The API key comes from the `ConfigSnapshot` of the current cycle, so a
//   reload rotates it without rebuilding the provider
// - The API key NEVER appears in logs or error messages
//
// ## API Reference
//
// - LiveDNS v5: https://api.gandi.net/docs/livedns/
// - Replace rrset: PUT `/domains/:fqdn/records/:rrset_name/:rrset_type`
//
// ```http
// PUT /v5/livedns/domains/example.com/records/home/A
// Authorization: Bearer <api key>
// Content-Type: application/json
//
// {"rrset_values": ["203.0.113.7"], "rrset_ttl": 300}
// ```

use async_trait::async_trait;
use ddns_core::traits::DnsUpdateClient;
use ddns_core::{ConfigSnapshot, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Gandi LiveDNS API base URL
pub const GANDI_API_BASE: &str = "https://api.gandi.net/v5/livedns";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a rrset replacement
#[derive(Debug, Serialize)]
struct RrsetUpdate {
    rrset_values: Vec<String>,
    rrset_ttl: u32,
}

/// Gandi LiveDNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the provider logs the URL and payload it would
/// send and reports success without contacting the API.
#[derive(Debug, Clone)]
pub struct GandiProvider {
    /// API base, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, skip the PUT
    dry_run: bool,
}

impl GandiProvider {
    /// Create a new Gandi provider
    ///
    /// # Parameters
    ///
    /// - `dry_run`: If true, log updates instead of sending them
    pub fn new(dry_run: bool) -> Self {
        Self::with_base_url(GANDI_API_BASE, dry_run)
    }

    /// Create a provider in live mode
    pub fn new_live() -> Self {
        Self::new(false)
    }

    /// Create a provider in dry-run mode
    pub fn new_dry_run() -> Self {
        Self::new(true)
    }

    /// Create a provider talking to a different API base
    pub fn with_base_url(base_url: impl Into<String>, dry_run: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        }
    }

    /// Whether updates are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// URL of the A rrset for `config`
    fn record_url(&self, config: &ConfigSnapshot) -> String {
        let endpoint = config.endpoint();
        format!(
            "{}/domains/{}/records/{}/A",
            self.base_url, endpoint.zone, endpoint.record_name
        )
    }
}

/// Map a non-2xx answer to an update error
///
/// Gandi error bodies are JSON objects with a `message` field; fall back to
/// the raw text when the body is anything else.
fn status_error(status: reqwest::StatusCode, body: &str, config: &ConfigSnapshot) -> Error {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());

    match status.as_u16() {
        401 | 403 => Error::update(format!(
            "Authentication failed: invalid API key or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::update(format!(
            "Zone or record not found: {} ({})",
            config.endpoint(),
            detail
        )),
        409 => Error::update(format!("Conflicting record: {} - {}", status, detail)),
        429 => Error::update(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::update(format!(
            "Gandi server error (transient): {} - {}",
            status, detail
        )),
        _ => Error::update(format!("Record update failed: {} - {}", status, detail)),
    }
}

#[async_trait]
impl DnsUpdateClient for GandiProvider {
    async fn update_record(
        &self,
        config: &ConfigSnapshot,
        new_ip: Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<()> {
        let url = self.record_url(config);
        let payload = RrsetUpdate {
            rrset_values: vec![new_ip.to_string()],
            rrset_ttl: ttl_secs,
        };

        tracing::info!(
            "Updating Gandi record {} -> {} (ttl {}) [mode: {}]",
            config.endpoint(),
            new_ip,
            ttl_secs,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!("DRY-RUN: would PUT {} with {:?}", url, payload);
            return Ok(());
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(config.api_key())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::update(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Gandi accepted update of {}: {}", config.endpoint(), status);
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        Err(status_error(status, &body, config))
    }

    fn provider_name(&self) -> &'static str {
        "gandi"
    }
}
