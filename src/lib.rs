//! EXG-Scope: streaming display pipeline for multi-channel physiological signals
//!
//! This library is the signal-processing core behind scrolling EEG/EXG scope
//! views. It takes raw multi-channel sample chunks from an acquisition
//! source, re-references and filters them with cross-chunk state continuity,
//! and deposits the result into a fixed-capacity circular window that a
//! renderer reads on its own timer. It provides:
//!
//! - Channel selection and referencing (common-average, single-electrode,
//!   bipolar) with display label derivation
//! - A toggleable filter chain (offset removal, lowpass, highpass, line-noise
//!   notch) whose output is independent of input chunking
//! - A wrapping sample window with renderer snapshots
//! - A thread-safe controller serializing producer, consumer, and
//!   reconfiguration access through one lock
//!
//! Rendering, UI wiring, and acquisition drivers are external collaborators.
//!
//! # Quick Start
//!
//! ```rust
//! use exg_scope::{ScopeConfig, ScopePipeline, SignalKind};
//!
//! fn main() -> Result<(), exg_scope::ScopeError> {
//!     let mut config = ScopeConfig::default();
//!     config.selection = vec![0, 1, 2, 3];
//!     let pipeline = ScopePipeline::new(&config)?;
//!
//!     // Acquisition callback: interleaved frames, one value per device channel
//!     let chunk = vec![0.0; 8 * 16];
//!     pipeline.ingest(SignalKind::Exg, &chunk)?;
//!
//!     // Renderer timer: copy out under the lock, draw afterwards
//!     let snapshot = pipeline.snapshot(SignalKind::Exg);
//!     println!("pointer at {}, {} channels", snapshot.pointer, snapshot.channels);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod processing;

// Re-export commonly used types for convenience
pub use buffer::SampleWindow;
pub use config::{AcquisitionConfig, DisplayConfig, ScopeConfig};
pub use error::{ScopeError, ScopeResult};
pub use processing::{
    ChannelRouter, FilterChain, FilterParam, FilterStage, ReferenceConfig, ScopePipeline,
    SignalKind, StageKind, WindowSnapshot,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
    }
}
