//! Collaborator traits for the DDNS system
//!
//! - [`WanIpResolver`]: Discover the public IPv4 address
//! - [`DomainResolver`]: Resolve the managed hostname through DNS
//! - [`DnsUpdateClient`]: Update the A record via the provider API
//! - [`ConfigSource`]: Read raw configuration

pub mod ip_source;
pub mod domain_resolver;
pub mod dns_provider;
pub mod config_source;

pub use ip_source::WanIpResolver;
pub use domain_resolver::{DomainResolver, SystemDomainResolver};
pub use dns_provider::DnsUpdateClient;
pub use config_source::ConfigSource;
