// # ddns-core
//
// Core library for the Gandi LiveDNS dynamic DNS agent.
//
// ## Architecture Overview
//
// This library keeps a single A record pointed at the host's public IPv4
// address:
// - **WanIpResolver**: Trait for discovering the public IPv4 address
// - **DomainResolver**: Trait for resolving the managed hostname through DNS
// - **DnsUpdateClient**: Trait for updating the record via the provider API
// - **ConfigSource**: Trait for reading raw configuration
// - **RetryExecutor**: Bounded retry with exponential backoff
// - **ReconciliationEngine**: Compares and conditionally updates, once per TTL
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP adapters
// 2. **Single owner of state**: Cache and configuration live behind one lock
// 3. **Every cycle recoverable**: Failures abort the cycle, never the process
// 4. **Library-First**: The daemon is a thin integration layer

pub mod traits;
pub mod engine;
pub mod cache;
pub mod retry;
pub mod config;
pub mod error;
pub mod source;

// Re-export core types for convenience
pub use traits::{ConfigSource, DnsUpdateClient, DomainResolver, SystemDomainResolver, WanIpResolver};
pub use engine::{CycleOutcome, CycleStage, ReconciliationEngine};
pub use cache::{DomainIpCache, MAX_USES};
pub use retry::{Backoff, BackoffInterrupter, Interrupted, RetryExecutor, RetryPolicy, TokioBackoff};
pub use config::{ConfigSnapshot, EngineConfig, RawConfig, RecordEndpoint};
pub use error::{Error, Result};
pub use source::PropertiesFile;
