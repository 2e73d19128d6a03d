// # WAN IP Resolver Trait
//
// Defines the interface for discovering the public IPv4 address this host
// is reachable at.
//
// ## Implementations
//
// - HTTP (ipify): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::WanIpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* WanIpResolver implementation */;
//     let wan_ip = resolver.current_public_ipv4().await?;
//     println!("WAN IP: {}", wan_ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IPv4 discovery
///
/// Implementations perform a single lookup per call. Retrying is owned by
/// the engine's [`RetryExecutor`](crate::RetryExecutor); an implementation
/// must not retry or cache between calls.
#[async_trait]
pub trait WanIpResolver: Send + Sync {
    /// Get the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The address as seen from outside the local network
    /// - `Err(Error::Resolution)`: Network failure, malformed response, or a
    ///   non-IPv4 answer
    async fn current_public_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Name of the source (for logging)
    fn source_name(&self) -> &'static str;
}
