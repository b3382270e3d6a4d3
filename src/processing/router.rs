// src/processing/router.rs
//! Channel selection and referencing
//!
//! The router picks an ordered subset of device channels out of each raw
//! frame and subtracts the configured reference signal. It also owns display
//! label derivation, which is a pure function of the selection and reference
//! mode.

use serde::{Deserialize, Serialize};

use crate::error::{ScopeError, ScopeResult};

/// Referencing transform applied after channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceConfig {
    /// Raw channels, no subtraction
    None,
    /// Subtract the per-sample mean of all device channels
    CommonAverageFull,
    /// Subtract the per-sample mean of the selected channels only
    CommonAverageSelected,
    /// Subtract one device channel from every selected channel
    SingleElectrode(usize),
    /// Subtract each selected channel's next device neighbor, wrapping
    Bipolar,
}

/// Selects device channels and applies the reference transform
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    /// Labels of the raw device channels, fixed per acquisition session
    labels: Vec<String>,
    /// Ordered unique indices into the device channel set
    selection: Vec<usize>,
    reference: ReferenceConfig,
}

fn validate_selection(selection: &[usize], device_channels: usize) -> ScopeResult<()> {
    for (i, &idx) in selection.iter().enumerate() {
        if idx >= device_channels {
            return Err(ScopeError::ChannelOutOfRange {
                index: idx,
                device_channels,
            });
        }
        if selection[..i].contains(&idx) {
            return Err(ScopeError::precondition(format!(
                "channel {idx} selected twice"
            )));
        }
    }
    Ok(())
}

impl ChannelRouter {
    /// Router over the given device channel set, empty selection, no reference.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            selection: Vec::new(),
            reference: ReferenceConfig::None,
        }
    }

    /// Number of raw device channels
    pub fn device_channels(&self) -> usize {
        self.labels.len()
    }

    /// Ordered selected device indices
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Number of selected channels
    pub fn num_selected(&self) -> usize {
        self.selection.len()
    }

    /// Current reference mode
    pub fn reference(&self) -> ReferenceConfig {
        self.reference
    }

    /// Replace the device channel set.
    ///
    /// Selection entries whose index is no longer valid are dropped; a
    /// single-electrode reference pointing outside the new set falls back to
    /// no referencing.
    pub fn define_channels(&mut self, labels: Vec<String>) {
        let device_channels = labels.len();
        self.labels = labels;
        self.selection.retain(|&idx| idx < device_channels);
        if let ReferenceConfig::SingleElectrode(r) = self.reference {
            if r >= device_channels {
                self.reference = ReferenceConfig::None;
            }
        }
    }

    /// Replace the selection; rejected without mutation on invalid indices.
    pub fn set_selection(&mut self, selection: Vec<usize>) -> ScopeResult<()> {
        validate_selection(&selection, self.device_channels())?;
        self.selection = selection;
        Ok(())
    }

    /// Replace the reference mode; rejected without mutation on an invalid target.
    pub fn set_reference(&mut self, reference: ReferenceConfig) -> ScopeResult<()> {
        if let ReferenceConfig::SingleElectrode(idx) = reference {
            if idx >= self.device_channels() {
                return Err(ScopeError::ChannelOutOfRange {
                    index: idx,
                    device_channels: self.device_channels(),
                });
            }
        }
        self.reference = reference;
        Ok(())
    }

    /// Copy selected channels out of interleaved raw frames and subtract the
    /// reference signal. `out` is resized to `frames * num_selected`.
    pub fn select_and_reference(&self, raw: &[f32], out: &mut Vec<f32>) -> ScopeResult<()> {
        let device = self.device_channels();
        if device == 0 {
            return Err(ScopeError::precondition("device channel set is empty"));
        }
        if raw.len() % device != 0 {
            return Err(ScopeError::precondition(format!(
                "raw slice length {} is not a multiple of {} device channels",
                raw.len(),
                device
            )));
        }
        let frames = raw.len() / device;
        let selected = self.selection.len();
        out.clear();
        out.resize(frames * selected, 0.0);
        if selected == 0 {
            return Ok(());
        }

        for (f, frame) in raw.chunks_exact(device).enumerate() {
            let out_frame = &mut out[f * selected..(f + 1) * selected];

            match self.reference {
                ReferenceConfig::None => {
                    for (i, &d) in self.selection.iter().enumerate() {
                        out_frame[i] = frame[d];
                    }
                }
                ReferenceConfig::CommonAverageFull => {
                    let mean = frame.iter().sum::<f32>() / device as f32;
                    for (i, &d) in self.selection.iter().enumerate() {
                        out_frame[i] = frame[d] - mean;
                    }
                }
                ReferenceConfig::CommonAverageSelected => {
                    let mean = self.selection.iter().map(|&d| frame[d]).sum::<f32>()
                        / selected as f32;
                    for (i, &d) in self.selection.iter().enumerate() {
                        out_frame[i] = frame[d] - mean;
                    }
                }
                ReferenceConfig::SingleElectrode(r) => {
                    let reference = frame[r];
                    for (i, &d) in self.selection.iter().enumerate() {
                        out_frame[i] = frame[d] - reference;
                    }
                }
                ReferenceConfig::Bipolar => {
                    for (i, &d) in self.selection.iter().enumerate() {
                        out_frame[i] = frame[d] - frame[(d + 1) % device];
                    }
                }
            }
        }
        Ok(())
    }

    /// Display labels for the selected channels under the current reference mode.
    pub fn channel_labels(&self) -> Vec<String> {
        let device = self.device_channels();
        self.selection
            .iter()
            .map(|&d| match self.reference {
                ReferenceConfig::Bipolar => {
                    format!("{}-{}", self.labels[d], self.labels[(d + 1) % device])
                }
                ReferenceConfig::SingleElectrode(r) => {
                    format!("{}-{}", self.labels[d], self.labels[r])
                }
                _ => self.labels[d].clone(),
            })
            .collect()
    }
}
