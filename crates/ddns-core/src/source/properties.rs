// # Properties File Source
//
// Reads `gandi.apikey` and `target.hostname` from a `.properties`
// file. The file is re-read on every `load()`, which is what makes SIGHUP
// reloads pick up edits.
//
// ## File Format
//
// ```text
// # Gandi personal access token
// gandi.apikey = 0123456789abcdef
// target.hostname: home.example.com
// ```
//
// - `key=value`, `key:value` or `key value`, split at the first separator
// - Lines starting with `#` or `!` are comments
// - Surrounding whitespace is trimmed; the last occurrence of a key wins

use std::path::{Path, PathBuf};

use crate::config::RawConfig;
use crate::error::{Error, Result};
use crate::traits::ConfigSource;

/// Default location of the properties file
pub const DEFAULT_PROPERTIES_PATH: &str = "/etc/gandi-ddns.properties";

/// Properties file on disk
#[derive(Debug, Clone)]
pub struct PropertiesFile {
    path: PathBuf,
}

impl PropertiesFile {
    /// Create a source for the file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse properties text into a raw config
    pub fn parse(contents: &str) -> RawConfig {
        RawConfig::from_pairs(contents.lines().filter_map(parse_line))
    }
}

fn parse_line(line: &str) -> Option<(&str, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    // The key ends at the first '=', ':' or whitespace; one '=' or ':' may
    // follow any whitespace after it
    let key_end = line
        .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
        .unwrap_or(line.len());
    let (key, rest) = line.split_at(key_end);
    let rest = rest.trim_start();
    let value = rest.strip_prefix(['=', ':']).unwrap_or(rest);

    Some((key, value.trim().to_string()))
}

impl ConfigSource for PropertiesFile {
    fn load(&self) -> Result<RawConfig> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::config(format!(
                "Failed to read properties from {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(Self::parse(&contents))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
