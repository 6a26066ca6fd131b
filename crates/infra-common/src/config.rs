//! Configuration file loading
//!
//! Configuration structs live next to the components they configure and
//! derive `Deserialize` with `#[serde(default)]`, so a file only needs the
//! keys it changes.

use crate::errors::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a configuration value from TOML text
pub fn from_toml_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
}

/// Load a configuration value from a TOML file
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    tracing::debug!("Loaded configuration from {}", path.display());
    from_toml_str(&text)
}
