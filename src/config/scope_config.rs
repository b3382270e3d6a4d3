// src/config/scope_config.rs
//! Display pipeline configuration structures

use serde::{Deserialize, Serialize};

use crate::error::{ScopeError, ScopeResult};
use crate::processing::router::ReferenceConfig;
use crate::processing::stage::{FilterParam, StageKind};

/// Complete configuration for one display pipeline
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScopeConfig {
    /// Device geometry and sampling rate
    pub acquisition: AcquisitionConfig,
    /// Scrolling window geometry
    pub display: DisplayConfig,
    /// Filter chain in application order
    pub filters: Vec<FilterParam>,
    /// Referencing mode applied after selection
    pub reference: ReferenceConfig,
    /// Initially selected device channels, in display order
    pub selection: Vec<usize>,
}

/// Acquisition geometry, fixed per session
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Number of channels the device delivers per frame
    pub device_channels: usize,
    /// One label per device channel; empty means auto-generated `CH{i}` labels
    pub channel_labels: Vec<String>,
    /// Device sampling rate in Hz
    pub sample_rate_hz: f32,
}

/// Scrolling window geometry
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Visible history in seconds
    pub window_seconds: f32,
    /// Keep every n-th processed frame; 1 keeps everything
    pub decimation: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            acquisition: AcquisitionConfig::default(),
            display: DisplayConfig::default(),
            filters: vec![
                FilterParam::disabled(StageKind::OffsetRemoval),
                FilterParam::disabled(StageKind::Lowpass),
                FilterParam::disabled(StageKind::Highpass),
                FilterParam::disabled(StageKind::Notch50),
            ],
            reference: ReferenceConfig::None,
            selection: Vec::new(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device_channels: 8,
            channel_labels: Vec::new(),
            sample_rate_hz: 500.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_seconds: 10.0,
            decimation: 1,
        }
    }
}

impl AcquisitionConfig {
    /// Configured labels, auto-generated when none were provided.
    pub fn labels(&self) -> Vec<String> {
        if self.channel_labels.is_empty() {
            (0..self.device_channels).map(|i| format!("CH{i}")).collect()
        } else {
            self.channel_labels.clone()
        }
    }
}

impl ScopeConfig {
    /// Semantic validation beyond what deserialization can catch.
    pub fn validate(&self) -> ScopeResult<()> {
        if self.acquisition.device_channels == 0 {
            return Err(ScopeError::Config(
                "device channel count must be at least 1".into(),
            ));
        }
        if !self.acquisition.channel_labels.is_empty()
            && self.acquisition.channel_labels.len() != self.acquisition.device_channels
        {
            return Err(ScopeError::Config(format!(
                "{} labels configured for {} device channels",
                self.acquisition.channel_labels.len(),
                self.acquisition.device_channels
            )));
        }
        if !(self.acquisition.sample_rate_hz.is_finite() && self.acquisition.sample_rate_hz > 0.0) {
            return Err(ScopeError::Config("sampling rate must be positive".into()));
        }
        if !(self.display.window_seconds.is_finite() && self.display.window_seconds > 0.0) {
            return Err(ScopeError::Config("window length must be positive".into()));
        }
        if self.display.decimation == 0 {
            return Err(ScopeError::Config("decimation factor must be at least 1".into()));
        }
        for (i, &idx) in self.selection.iter().enumerate() {
            if idx >= self.acquisition.device_channels {
                return Err(ScopeError::Config(format!(
                    "selected channel {idx} out of range"
                )));
            }
            if self.selection[..i].contains(&idx) {
                return Err(ScopeError::Config(format!("channel {idx} selected twice")));
            }
        }
        if let ReferenceConfig::SingleElectrode(r) = self.reference {
            if r >= self.acquisition.device_channels {
                return Err(ScopeError::Config(format!(
                    "reference electrode {r} out of range"
                )));
            }
        }
        let mut seen = Vec::new();
        for param in &self.filters {
            if seen.contains(&param.kind) {
                return Err(ScopeError::Config(format!(
                    "duplicate {:?} filter stage",
                    param.kind
                )));
            }
            seen.push(param.kind);
        }
        Ok(())
    }

    /// Window capacity in frames for the configured geometry.
    pub fn window_capacity(&self) -> usize {
        let frames = (self.display.window_seconds * self.acquisition.sample_rate_hz
            / self.display.decimation as f32) as usize;
        frames.max(1)
    }
}
