// src/processing/mod.rs
//! Streaming signal processing for the display pipeline

pub mod chain;
pub mod pipeline;
pub mod router;
pub mod stage;

pub use chain::FilterChain;
pub use pipeline::{ScopePipeline, SignalKind, WindowSnapshot};
pub use router::{ChannelRouter, ReferenceConfig};
pub use stage::{FilterParam, FilterStage, StageKind};
