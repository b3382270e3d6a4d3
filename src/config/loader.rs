// src/config/loader.rs
//! TOML configuration loading with validation

use std::path::Path;

use tracing::info;

use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};

/// Load and validate a pipeline configuration from a TOML file.
pub fn load_from_path(path: impl AsRef<Path>) -> ScopeResult<ScopeConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        ScopeError::Config(format!("cannot read {}: {e}", path.display()))
    })?;
    let config = parse(&text)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Parse and validate a TOML configuration string.
pub fn parse(text: &str) -> ScopeResult<ScopeConfig> {
    let config: ScopeConfig =
        toml::from_str(text).map_err(|e| ScopeError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
