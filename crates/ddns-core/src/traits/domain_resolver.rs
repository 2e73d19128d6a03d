// # Domain Resolver Trait
//
// Resolves the managed hostname's current A record through ordinary DNS,
// independently of the provider API. The engine uses it to re-check ground
// truth once its cached answer has been trusted for too many cycles.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Error, Result};

/// Trait for A record lookups
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// Resolve `domain` to an IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The first IPv4 address found
    /// - `Err(Error::Resolution)`: Lookup failed or returned no IPv4 address
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr>;
}

/// Resolver backed by the operating system's resolver
///
/// Uses [`tokio::net::lookup_host`], so `/etc/hosts` and the system's
/// configured nameservers apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDomainResolver;

impl SystemDomainResolver {
    /// Create a new system resolver
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DomainResolver for SystemDomainResolver {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr> {
        let addrs = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|e| Error::resolution(format!("Failed to resolve {}: {}", domain, e)))?;

        addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| Error::resolution(format!("No IPv4 address found for {}", domain)))
    }
}
