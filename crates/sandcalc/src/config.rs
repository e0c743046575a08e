//! Command configuration

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default bot prefix placed before the trigger word.
pub const DEFAULT_PREFIX: &str = ".";

/// Default wall-clock budget for one evaluation, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default number of result characters shown before truncation.
pub const DEFAULT_LENGTH_LIMIT: usize = 300;

/// Default number of newlines a reply may contain.
pub const DEFAULT_NEWLINE_LIMIT: usize = 30;

/// Settings for the calculator command.
///
/// Every field has a default, so a JSON file only needs the keys it
/// changes:
///
/// ```
/// use sandcalc::CalcConfig;
///
/// let config = CalcConfig::from_json(r#"{ "prefix": "!" }"#).unwrap();
/// assert_eq!(config.prefix, "!");
/// assert_eq!(config.timeout_ms, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalcConfig {
    /// Bot prefix placed before the trigger word
    pub prefix: String,

    /// Evaluation timeout in milliseconds
    pub timeout_ms: u64,

    /// Result characters shown before the ellipsis marker
    pub length_limit: usize,

    /// Newlines a result may contain before it is withheld
    pub newline_limit: usize,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            length_limit: DEFAULT_LENGTH_LIMIT,
            newline_limit: DEFAULT_NEWLINE_LIMIT,
        }
    }
}

/// Error loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CalcConfig {
    /// Parse configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown keys.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`CalcConfig::from_json`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The evaluation timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = CalcConfig::default();
        assert_eq!(config.prefix, ".");
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.length_limit, 300);
        assert_eq!(config.newline_limit, 30);
    }

    #[test]
    fn test_partial_json() {
        let config = CalcConfig::from_json(r#"{"timeout_ms": 250, "newline_limit": 5}"#).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.newline_limit, 5);
        assert_eq!(config.prefix, ".");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = CalcConfig::from_json(r#"{"timeout": 1}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CalcConfig::from_json_file("/nonexistent/sandcalc.json").unwrap_err();
        assert!(err.to_string().starts_with("cannot read /nonexistent/sandcalc.json"));
    }
}
