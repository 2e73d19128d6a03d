// # HTTP WAN IP Resolver
//
// This crate discovers the public IPv4 address of the host by asking an
// external "what is my IP" service over HTTPS.
//
// ## Service
//
// The default is ipify (`https://api.ipify.org`), which answers a plain GET
// with the caller's address as a bare text body. Any service with the same
// contract can be configured instead (`DDNS_IP_SOURCE_URL`).
//
// ## Scope
//
// One GET per call. No caching, no retries: the engine wraps every call in
// its RetryExecutor and decides how often to ask.
//
// ## Usage
//
// ```rust,no_run
// use ddns_core::WanIpResolver;
// use ddns_ip_http::IpifyResolver;
//
// # async fn demo() -> ddns_core::Result<()> {
// let resolver = IpifyResolver::new();
// let ip = resolver.current_public_ipv4().await?;
// println!("public address: {}", ip);
// # Ok(())
// # }
// ```

use ddns_core::traits::WanIpResolver;
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default public IP service
pub const DEFAULT_IP_SOURCE_URL: &str = "https://api.ipify.org";

/// HTTP timeout for a single lookup
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Public IPv4 lookup via an ipify-compatible HTTP service
#[derive(Debug, Clone)]
pub struct IpifyResolver {
    /// URL returning the caller's address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl IpifyResolver {
    /// Create a resolver against api.ipify.org
    pub fn new() -> Self {
        Self::with_url(DEFAULT_IP_SOURCE_URL)
    }

    /// Create a resolver against a custom service URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The service URL in use
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for IpifyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a service response body into an IPv4 address
fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();

    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::resolution(format!(
            "Expected IPv4, got: {}",
            ip
        ))),
        Err(_) => Err(Error::resolution(format!("Invalid IP address: {:?}", text))),
    }
}

#[async_trait::async_trait]
impl WanIpResolver for IpifyResolver {
    async fn current_public_ipv4(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::resolution(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Failed to read response: {}", e)))?;

        let ip = parse_ipv4(&body)?;
        tracing::debug!("{} reports public address {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "ipify"
    }
}
