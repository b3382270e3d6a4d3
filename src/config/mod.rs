// src/config/mod.rs
//! Configuration for the display pipeline
//!
//! One explicit [`ScopeConfig`] object describes an entire pipeline:
//! acquisition geometry, display window, filter chain and referencing. It is
//! constructed once (defaults, code, or a TOML file via [`loader`]) and handed
//! to the pipeline controller; there is no global configuration state.

pub mod loader;
pub mod scope_config;

pub use loader::load_from_path;
pub use scope_config::{AcquisitionConfig, DisplayConfig, ScopeConfig};
