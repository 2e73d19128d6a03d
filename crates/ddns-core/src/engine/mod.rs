//! Core reconciliation engine
//!
//! The ReconciliationEngine is responsible for:
//! - Fetching the public IPv4 address via WanIpResolver
//! - Deciding whether the cached resolution of the hostname is still trusted
//! - Updating the A record via DnsUpdateClient when the two differ
//! - Swapping configuration on reload without disturbing a running cycle
//!
//! ## Architecture
//!
//! ```text
//!   scheduler ── run() ──┐          ┌── reload() ── SIGHUP
//!                        ▼          ▼
//!               ┌──────────────────────────┐
//!               │   ReconciliationEngine   │
//!               │  Mutex<config + cache>   │
//!               └──────────────────────────┘
//!                   │         │         │
//!         ┌─────────┘         │         └──────────┐
//!         ▼                   ▼                    ▼
//! ┌───────────────┐  ┌────────────────┐  ┌─────────────────┐
//! │ WanIpResolver │  │ DomainResolver │  │ DnsUpdateClient │
//! └───────────────┘  └────────────────┘  └─────────────────┘
//!         (every call wrapped in RetryExecutor)
//! ```
//!
//! ## Cycle
//!
//! 1. Capture the active ConfigSnapshot
//! 2. Fetch the WAN IP
//! 3. Spend one use of the cache; re-resolve the hostname if it is empty or
//!    that use was the last one
//! 4. Compare; stop if equal
//! 5. Update the record, then cache the published address
//!
//! Any exhausted retry aborts the cycle with the cache as it was. The next
//! cycle starts from scratch.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info};

use crate::cache::DomainIpCache;
use crate::config::{ConfigSnapshot, EngineConfig, RawConfig};
use crate::error::{Error, Result};
use crate::retry::{Backoff, RetryExecutor};
use crate::traits::{ConfigSource, DnsUpdateClient, DomainResolver, WanIpResolver};

/// Step of a cycle at which it was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    /// Looking up the public IPv4 address
    FetchingWanIp,
    /// Forced re-resolution of the hostname
    RefreshingDomain,
    /// Pushing the new address to the provider
    Updating,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The hostname already points at the WAN IP
    NoUpdateNeeded {
        /// The matching address
        ip: Ipv4Addr,
    },

    /// The record was updated
    Updated {
        /// The address the hostname was believed to have
        previous_ip: Ipv4Addr,
        /// The address published
        new_ip: Ipv4Addr,
    },

    /// The cycle gave up; nothing was changed
    Aborted {
        /// Where it stopped
        stage: CycleStage,
        /// The final error, rendered
        reason: String,
    },
}

/// State shared by `run()` and `reload()`
#[derive(Debug)]
struct EngineState {
    config: Arc<ConfigSnapshot>,
    cache: DomainIpCache,
}

/// Core reconciliation engine
///
/// ## Threading
///
/// `run()` holds the state lock for the entire cycle, so overlapping calls
/// are serialized: a second `run()` waits and then performs its own full
/// cycle. `reload()` takes the same lock and therefore lands either before a
/// cycle starts or after it finishes.
pub struct ReconciliationEngine {
    /// Public IP discovery
    wan_resolver: Box<dyn WanIpResolver>,

    /// Ground-truth lookups of the hostname
    domain_resolver: Box<dyn DomainResolver>,

    /// DNS provider for updating the record
    provider: Box<dyn DnsUpdateClient>,

    /// Retry policy for every network call
    retry: RetryExecutor,

    /// TTL written to the record
    ttl_secs: u32,

    state: Mutex<EngineState>,
}

impl ReconciliationEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `wan_resolver`: Public IP source
    /// - `domain_resolver`: DNS lookups of the managed hostname
    /// - `provider`: DNS update client
    /// - `config`: Initial validated configuration
    /// - `engine_config`: TTL and retry settings
    /// - `backoff`: How to wait between retry attempts
    pub fn new(
        wan_resolver: Box<dyn WanIpResolver>,
        domain_resolver: Box<dyn DomainResolver>,
        provider: Box<dyn DnsUpdateClient>,
        config: ConfigSnapshot,
        engine_config: &EngineConfig,
        backoff: Arc<dyn Backoff>,
    ) -> Self {
        Self {
            wan_resolver,
            domain_resolver,
            provider,
            retry: RetryExecutor::new(engine_config.retry_policy(), backoff),
            ttl_secs: engine_config.ttl_secs,
            state: Mutex::new(EngineState {
                config: Arc::new(config),
                cache: DomainIpCache::new(),
            }),
        }
    }

    /// Execute one reconciliation cycle
    ///
    /// Never fails: errors are logged and reported as [`CycleOutcome::Aborted`].
    pub async fn run(&self) -> CycleOutcome {
        let mut state = self.state.lock().await;
        let config = Arc::clone(&state.config);
        let domain = config.domain_name();

        let wan_resolver = self.wan_resolver.as_ref();
        let wan_ip = match self
            .retry
            .execute("fetch WAN IP", move || wan_resolver.current_public_ipv4())
            .await
        {
            Ok(ip) => ip,
            Err(e) => return abort(CycleStage::FetchingWanIp, e),
        };
        debug!("WAN IP from {}: {}", self.wan_resolver.source_name(), wan_ip);

        let domain_ip = match state.cache.take_trusted() {
            Some(ip) => {
                debug!(
                    "Using cached address {} for {} ({} use(s) left)",
                    ip,
                    domain,
                    state.cache.uses_remaining()
                );
                ip
            }
            None => {
                info!("Cached lookup for {} is absent or used up, resolving", domain);
                let resolver = self.domain_resolver.as_ref();
                let label = format!("resolve {}", domain);
                match self
                    .retry
                    .execute(&label, move || resolver.resolve_ipv4(domain))
                    .await
                {
                    Ok(ip) => {
                        state.cache.record_resolution(ip);
                        ip
                    }
                    Err(e) => return abort(CycleStage::RefreshingDomain, e),
                }
            }
        };

        if domain_ip == wan_ip {
            info!("WAN IP and {} match {}. No update needed.", domain, wan_ip);
            return CycleOutcome::NoUpdateNeeded { ip: wan_ip };
        }

        info!(
            "WAN IP {} and {} ({}) do not match. Updating via {}",
            wan_ip,
            domain,
            domain_ip,
            self.provider.provider_name()
        );

        let provider = self.provider.as_ref();
        let snapshot = config.as_ref();
        let ttl_secs = self.ttl_secs;
        let label = format!("update {}", domain);
        match self
            .retry
            .execute(&label, move || provider.update_record(snapshot, wan_ip, ttl_secs))
            .await
        {
            Ok(()) => {
                state.cache.record_update(wan_ip);
                info!("Updated {} -> {} (previous: {})", domain, wan_ip, domain_ip);
                CycleOutcome::Updated {
                    previous_ip: domain_ip,
                    new_ip: wan_ip,
                }
            }
            Err(e) => abort(CycleStage::Updating, e),
        }
    }

    /// Replace the active configuration and clear the cache
    ///
    /// Waits for a running cycle to finish; the next cycle uses `config` and
    /// resolves the hostname afresh.
    pub async fn reload(&self, config: ConfigSnapshot) {
        let mut state = self.state.lock().await;
        replace_config(&mut state, config);
    }

    /// Validate raw values, then reload
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if validation fails; the active configuration and
    /// cache are left untouched.
    pub async fn reload_raw(&self, raw: &RawConfig) -> Result<()> {
        let config = validate_reload(raw)?;
        self.reload(config).await;
        Ok(())
    }

    /// Re-read `source` and reload from it
    ///
    /// The source is read only once the engine lock is held, so when reloads
    /// queue up behind a running cycle each one sees the latest contents.
    pub async fn reload_from(&self, source: &dyn ConfigSource) -> Result<()> {
        let mut state = self.state.lock().await;
        let raw = source.load().inspect_err(|e| {
            error!("Failed to read {}, keeping previous configuration: {}", source.describe(), e);
        })?;
        let config = validate_reload(&raw)?;
        replace_config(&mut state, config);
        Ok(())
    }

    /// The configuration the next cycle will use
    pub async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.state.lock().await.config)
    }

    /// Copy of the current cache state
    pub async fn cache_state(&self) -> DomainIpCache {
        self.state.lock().await.cache
    }

    /// Run cycles with a fixed delay until `shutdown` becomes `true`
    ///
    /// The first cycle starts immediately; each following one starts `period`
    /// after the previous one finished. A cycle in progress when shutdown is
    /// requested runs to completion.
    pub async fn run_periodically(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!("Scheduling reconciliation every {:?}", period);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = self.run().await;
            debug!("Cycle finished: {:?}", outcome);

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        info!("Reconciliation scheduler stopped");
    }
}

/// Resolves once the flag is `true` or the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn validate_reload(raw: &RawConfig) -> Result<ConfigSnapshot> {
    ConfigSnapshot::from_raw(raw).inspect_err(|e| {
        error!("Rejected configuration reload, keeping previous: {}", e);
    })
}

fn replace_config(state: &mut EngineState, config: ConfigSnapshot) {
    info!(
        "Reloading configuration: {} -> {}",
        state.config.domain_name(),
        config.domain_name()
    );
    state.config = Arc::new(config);
    state.cache.reset();
}

fn abort(stage: CycleStage, err: Error) -> CycleOutcome {
    error!("{:?} failed, aborting run: {}", stage, err);
    CycleOutcome::Aborted {
        stage,
        reason: err.to_string(),
    }
}
