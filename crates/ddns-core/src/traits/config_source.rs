// # Config Source Trait
//
// Supplies raw `gandi.apikey` / `target.hostname` values on demand. Sources
// only read; validation happens in `ConfigSnapshot::from_raw`.

use crate::config::RawConfig;
use crate::error::Result;

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
    /// Read the current raw configuration
    ///
    /// # Returns
    ///
    /// - `Ok(RawConfig)`: Values found (possibly missing keys)
    /// - `Err(Error::Config)`: The source could not be read
    fn load(&self) -> Result<RawConfig>;

    /// Human-readable description of the source (for logging)
    fn describe(&self) -> String;
}
