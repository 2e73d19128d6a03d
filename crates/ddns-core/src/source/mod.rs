// # Config Source Implementations
//
// This module provides implementations of the ConfigSource trait.

pub mod properties;

pub use properties::{DEFAULT_PROPERTIES_PATH, PropertiesFile};
