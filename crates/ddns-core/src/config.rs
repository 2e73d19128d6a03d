//! Configuration types for the DDNS system
//!
//! - [`RawConfig`]: unvalidated key/value input from a [`ConfigSource`](crate::ConfigSource)
//! - [`ConfigSnapshot`]: validated, immutable view the engine works from
//! - [`EngineConfig`]: timing and retry settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// Property key holding the Gandi API key
pub const KEY_API_KEY: &str = "gandi.apikey";

/// Property key holding the hostname whose A record is managed
pub const KEY_TARGET_HOSTNAME: &str = "target.hostname";

/// Unvalidated configuration as read from a config source
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    /// Value of `gandi.apikey`
    pub api_key: Option<String>,
    /// Value of `target.hostname`
    pub target_hostname: Option<String>,
}

impl RawConfig {
    /// Create a raw config from explicit values
    pub fn new(api_key: impl Into<String>, target_hostname: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            target_hostname: Some(target_hostname.into()),
        }
    }

    /// Build from key/value pairs, ignoring unknown keys (last occurrence wins)
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                KEY_API_KEY => raw.api_key = Some(value.into()),
                KEY_TARGET_HOSTNAME => raw.target_hostname = Some(value.into()),
                _ => {}
            }
        }
        raw
    }
}

impl fmt::Debug for RawConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("target_hostname", &self.target_hostname)
            .finish()
    }
}

/// Where an update for the managed record is sent
///
/// For `home.example.com` the zone is `example.com` and the record name `home`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEndpoint {
    /// The DNS zone (`base.tld`)
    pub zone: String,
    /// The record name inside the zone (first label)
    pub record_name: String,
}

impl fmt::Display for RecordEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.record_name)
    }
}

/// Validated configuration used for a whole reconciliation cycle
///
/// Instances can only be obtained through validation, so holding one
/// guarantees a non-blank API key and a three-label hostname.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// ⚠️ NEVER log this value
    api_key: String,
    domain_name: String,
    endpoint: RecordEndpoint,
}

impl ConfigSnapshot {
    /// Validate an API key and hostname
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when either value is blank or the hostname is not
    /// exactly `name.base.tld`.
    pub fn new(api_key: &str, domain_name: &str) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::config(format!("{} must be set", KEY_API_KEY)));
        }

        let domain_name = domain_name.trim().to_ascii_lowercase();
        if domain_name.is_empty() {
            return Err(Error::config(format!("{} must be set", KEY_TARGET_HOSTNAME)));
        }

        validate_domain_name(&domain_name)?;

        let endpoint = match domain_name.split('.').collect::<Vec<_>>().as_slice() {
            [name, base, tld] => RecordEndpoint {
                zone: format!("{}.{}", base, tld),
                record_name: (*name).to_string(),
            },
            labels => {
                return Err(Error::config(format!(
                    "{} must have exactly three labels (name.base.tld), got {} in '{}'",
                    KEY_TARGET_HOSTNAME,
                    labels.len(),
                    domain_name
                )));
            }
        };

        Ok(Self {
            api_key: api_key.to_string(),
            domain_name,
            endpoint,
        })
    }

    /// Validate raw key/value configuration
    pub fn from_raw(raw: &RawConfig) -> Result<Self> {
        let api_key = raw
            .api_key
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is missing", KEY_API_KEY)))?;
        let hostname = raw
            .target_hostname
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is missing", KEY_TARGET_HOSTNAME)))?;

        Self::new(api_key, hostname)
    }

    /// The API key (for the provider's Authorization header only)
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The fully-qualified hostname, lowercased
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    /// Zone and record name derived from the hostname
    pub fn endpoint(&self) -> &RecordEndpoint {
        &self.endpoint
    }
}

impl fmt::Debug for ConfigSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSnapshot")
            .field("api_key", &"<redacted>")
            .field("domain_name", &self.domain_name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Basic RFC 1035 checks on each label
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// TTL written to the record, also the delay between cycles (in seconds)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u32,

    /// Attempts per operation before the cycle is aborted
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles after each further failure (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl EngineConfig {
    /// Delay between the end of one cycle and the start of the next
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_secs))
    }

    /// Retry policy applied to every network operation of a cycle
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_ttl_secs() -> u32 {
    300
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    10
}
