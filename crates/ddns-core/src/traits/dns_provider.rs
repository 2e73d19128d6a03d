// # DNS Update Client Trait
//
// Defines the interface for pushing a new A record value to the DNS
// provider's API.
//
// ## Implementations
//
// - Gandi LiveDNS: `ddns-provider-gandi` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{ConfigSnapshot, DnsUpdateClient};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsUpdateClient implementation */;
//     let config = ConfigSnapshot::new("api-key", "home.example.com")?;
//
//     provider
//         .update_record(&config, std::net::Ipv4Addr::new(203, 0, 113, 7), 300)
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

use crate::config::ConfigSnapshot;

/// Trait for DNS provider implementations
///
/// # Contract
///
/// - One API call per invocation; no retry, backoff or caching (owned by
///   [`ReconciliationEngine`](crate::ReconciliationEngine))
/// - Success is any 2xx answer; response bodies are not interpreted beyond that
/// - The API key from the snapshot is only ever sent as a credential, never logged
#[async_trait]
pub trait DnsUpdateClient: Send + Sync {
    /// Set the A record described by `config` to `new_ip`
    ///
    /// # Parameters
    ///
    /// - `config`: Snapshot holding the API key and the record endpoint
    /// - `new_ip`: The address to publish
    /// - `ttl_secs`: TTL to set on the record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider accepted the update
    /// - `Err(Error::Update)`: Non-2xx answer or transport failure
    async fn update_record(
        &self,
        config: &ConfigSnapshot,
        new_ip: Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
