//! Cached resolution of the managed hostname
//!
//! The engine does not resolve the hostname on every cycle. Every cycle spends
//! one use of the cached address; the cycle that spends the last one resolves
//! the hostname again instead of trusting the cache. With [`MAX_USES`] = 2 a
//! lookup or successful update is trusted for one following cycle, so an
//! update that silently failed to propagate, or a record edited elsewhere, is
//! noticed within two cycles.

use std::net::Ipv4Addr;

/// Number of cycles a cached address is trusted before re-resolution
pub const MAX_USES: u8 = 2;

/// Last known address of the managed hostname plus its freshness counter
///
/// `uses_remaining` stays within `0..=MAX_USES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainIpCache {
    cached_ip: Option<Ipv4Addr>,
    uses_remaining: u8,
}

impl DomainIpCache {
    /// Empty cache with a full counter
    pub fn new() -> Self {
        Self {
            cached_ip: None,
            uses_remaining: MAX_USES,
        }
    }

    /// The cached address, if any lookup or update has succeeded
    pub fn cached_ip(&self) -> Option<Ipv4Addr> {
        self.cached_ip
    }

    /// Cycles left before a forced re-resolution
    pub fn uses_remaining(&self) -> u8 {
        self.uses_remaining
    }

    /// Spend one use and return the cached address if it is still trusted
    ///
    /// `None` means the cycle must resolve the hostname: the cache is empty or
    /// this use brought the counter to zero.
    pub fn take_trusted(&mut self) -> Option<Ipv4Addr> {
        self.uses_remaining = self.uses_remaining.saturating_sub(1);
        self.cached_ip.filter(|_| self.uses_remaining > 0)
    }

    /// Store the result of a successful lookup
    pub fn record_resolution(&mut self, ip: Ipv4Addr) {
        self.store(ip);
    }

    /// Store the address just published by a successful update
    ///
    /// Saves a lookup on the next cycle; staleness stays bounded by the counter.
    pub fn record_update(&mut self, ip: Ipv4Addr) {
        self.store(ip);
    }

    /// Forget the cached address and refill the counter
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn store(&mut self, ip: Ipv4Addr) {
        self.cached_ip = Some(ip);
        self.uses_remaining = MAX_USES;
    }
}

impl Default for DomainIpCache {
    fn default() -> Self {
        Self::new()
    }
}
