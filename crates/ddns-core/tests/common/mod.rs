//! Test doubles and common utilities for engine contract tests
//!
//! Every double is `Clone` and shares its counters and scripts across
//! clones, so a test can hand one clone to the engine and inspect another.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::{
    Backoff, ConfigSnapshot, DnsUpdateClient, DomainResolver, EngineConfig, Interrupted,
    ReconciliationEngine, WanIpResolver,
};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const BASE_DELAY: Duration = Duration::from_secs(10);

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}

/// Scripted answers: queued results first, then the fallback
#[derive(Clone)]
struct Script {
    queue: Arc<Mutex<VecDeque<std::result::Result<Ipv4Addr, String>>>>,
    fallback: Arc<Mutex<std::result::Result<Ipv4Addr, String>>>,
}

impl Script {
    fn new(fallback: Ipv4Addr) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(Ok(fallback))),
        }
    }

    fn next(&self) -> std::result::Result<Ipv4Addr, String> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

/// Lets a test hold a call open until it says so
#[derive(Clone, Default)]
pub struct Gate {
    armed: Arc<AtomicBool>,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Hold the next call until [`Gate::release`]
    pub fn hold_next(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Wait until a held call has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the held call complete
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// A scripted WanIpResolver that tracks calls
#[derive(Clone)]
pub struct MockWanResolver {
    script: Script,
    call_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    pub gate: Gate,
}

impl MockWanResolver {
    pub fn new(wan_ip: Ipv4Addr) -> Self {
        Self {
            script: Script::new(wan_ip),
            call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            gate: Gate::default(),
        }
    }

    /// Answer every unscripted call with `wan_ip`
    pub fn set_ip(&self, wan_ip: Ipv4Addr) {
        *self.script.fallback.lock().unwrap() = Ok(wan_ip);
    }

    /// Fail every unscripted call
    pub fn fail_always(&self) {
        *self.script.fallback.lock().unwrap() = Err("api.ipify.org unreachable".to_string());
    }

    /// Fail the next call only
    pub fn fail_next(&self) {
        self.script
            .queue
            .lock()
            .unwrap()
            .push_back(Err("connection reset".to_string()));
    }

    /// Get the number of times current_public_ipv4() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl WanIpResolver for MockWanResolver {
    async fn current_public_ipv4(&self) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.gate.pass().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.script.next().map_err(Error::resolution)
    }

    fn source_name(&self) -> &'static str {
        "mock"
    }
}

/// A scripted DomainResolver that records looked-up names
#[derive(Clone)]
pub struct MockDomainResolver {
    script: Script,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl MockDomainResolver {
    pub fn new(domain_ip: Ipv4Addr) -> Self {
        Self {
            script: Script::new(domain_ip),
            lookups: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every unscripted lookup with `domain_ip`
    pub fn set_ip(&self, domain_ip: Ipv4Addr) {
        *self.script.fallback.lock().unwrap() = Ok(domain_ip);
    }

    /// Fail every unscripted lookup
    pub fn fail_always(&self) {
        *self.script.fallback.lock().unwrap() = Err("NXDOMAIN".to_string());
    }

    /// Get the number of lookups performed
    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }

    /// Names passed to resolve_ipv4(), in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DomainResolver for MockDomainResolver {
    async fn resolve_ipv4(&self, domain: &str) -> Result<Ipv4Addr> {
        self.lookups.lock().unwrap().push(domain.to_string());
        self.script.next().map_err(Error::resolution)
    }
}

/// One recorded update_record() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCall {
    pub zone: String,
    pub record_name: String,
    pub api_key: String,
    pub new_ip: Ipv4Addr,
    pub ttl_secs: u32,
}

/// A DnsUpdateClient that records calls and fails on demand
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    calls: Arc<Mutex<Vec<UpdateCall>>>,
    failing: Arc<AtomicBool>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call as if the API returned HTTP 500
    pub fn fail_always(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Recorded calls, in order
    pub fn calls(&self) -> Vec<UpdateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsUpdateClient for MockDnsProvider {
    async fn update_record(
        &self,
        config: &ConfigSnapshot,
        new_ip: Ipv4Addr,
        ttl_secs: u32,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(UpdateCall {
            zone: config.endpoint().zone.clone(),
            record_name: config.endpoint().record_name.clone(),
            api_key: config.api_key().to_string(),
            new_ip,
            ttl_secs,
        });

        if self.failing.load(Ordering::SeqCst) {
            Err(Error::update("HTTP 500 Internal Server Error"))
        } else {
            Ok(())
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Backoff that records delays and returns immediately
#[derive(Clone, Default)]
pub struct RecordingBackoff {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingBackoff {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.delays.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl Backoff for RecordingBackoff {
    async fn wait(&self, delay: Duration) -> std::result::Result<(), Interrupted> {
        self.delays.lock().unwrap().push(delay);
        Ok(())
    }
}

/// An engine wired to mocks, plus handles on each mock
pub struct Harness {
    pub engine: Arc<ReconciliationEngine>,
    pub wan: MockWanResolver,
    pub resolver: MockDomainResolver,
    pub provider: MockDnsProvider,
    pub backoff: RecordingBackoff,
}

/// Engine for `home.example.com` with WAN IP and DNS both at `initial`
pub fn harness(initial: Ipv4Addr) -> Harness {
    harness_for("home.example.com", initial)
}

pub fn harness_for(hostname: &str, initial: Ipv4Addr) -> Harness {
    let wan = MockWanResolver::new(initial);
    let resolver = MockDomainResolver::new(initial);
    let provider = MockDnsProvider::new();
    let backoff = RecordingBackoff::default();

    let engine = ReconciliationEngine::new(
        Box::new(wan.clone()),
        Box::new(resolver.clone()),
        Box::new(provider.clone()),
        ConfigSnapshot::new("test-api-key", hostname).expect("valid test config"),
        &test_engine_config(),
        Arc::new(backoff.clone()),
    );

    Harness {
        engine: Arc::new(engine),
        wan,
        resolver,
        provider,
        backoff,
    }
}

/// Engine for `home.example.com` using `wan` and a caller-chosen backoff
pub fn engine_with_backoff(
    wan: &MockWanResolver,
    backoff: Arc<dyn Backoff>,
) -> Arc<ReconciliationEngine> {
    Arc::new(ReconciliationEngine::new(
        Box::new(wan.clone()),
        Box::new(MockDomainResolver::new(ip(1, 2, 3, 4))),
        Box::new(MockDnsProvider::new()),
        ConfigSnapshot::new("test-api-key", "home.example.com").expect("valid test config"),
        &test_engine_config(),
        backoff,
    ))
}

pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        ttl_secs: 300,
        max_attempts: 3,
        retry_delay_secs: BASE_DELAY.as_secs(),
    }
}
