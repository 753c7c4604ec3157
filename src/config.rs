//! JSON-backed configuration loading shared by the tunable parts of the crate.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Range checks run after a configuration has been deserialized.
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Parses and validates a configuration. Missing fields take their defaults
/// when the target type is `#[serde(default)]`.
pub fn from_json_str<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ConfigError> {
    let config: T = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

pub fn from_json_file<T, P>(path: P) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
    P: AsRef<Path>,
{
    let text = fs::read_to_string(path)?;
    from_json_str(&text)
}

pub(crate) fn require(ok: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message()))
    }
}
