// src/processing/chain.rs
//! Ordered, independently-toggleable sequence of filter stages

use tracing::debug;

use crate::error::{ScopeError, ScopeResult};
use crate::processing::stage::{FilterParam, FilterStage, StageKind};

/// One slot in the chain: user settings plus the live filter they describe
#[derive(Debug, Clone)]
struct ChainSlot {
    param: FilterParam,
    stage: FilterStage,
}

/// An ordered list of filter stages applied to one channel stream
///
/// Disabled stages are skipped entirely: they neither touch the samples nor
/// advance their history. Any parameter or enable change rebuilds the affected
/// stage and re-primes it from the next chunk, so toggling a filter never
/// injects a step transient into the display.
#[derive(Debug, Clone)]
pub struct FilterChain {
    slots: Vec<ChainSlot>,
    sample_rate_hz: f32,
}

impl FilterChain {
    /// Build a chain from ordered stage settings.
    pub fn new(params: &[FilterParam], sample_rate_hz: f32) -> ScopeResult<Self> {
        let mut slots = Vec::with_capacity(params.len());
        for param in params {
            let stage = FilterStage::new(param.kind, param.cutoff_hz, sample_rate_hz)?;
            slots.push(ChainSlot { param: *param, stage });
        }
        Ok(Self {
            slots,
            sample_rate_hz,
        })
    }

    /// The display default: offset removal, lowpass, highpass, line-noise
    /// notch, all disabled until the user turns them on.
    pub fn display_default(sample_rate_hz: f32) -> ScopeResult<Self> {
        Self::new(
            &[
                FilterParam::disabled(StageKind::OffsetRemoval),
                FilterParam::disabled(StageKind::Lowpass),
                FilterParam::disabled(StageKind::Highpass),
                FilterParam::disabled(StageKind::Notch50),
            ],
            sample_rate_hz,
        )
    }

    /// Current settings in chain order.
    pub fn params(&self) -> Vec<FilterParam> {
        self.slots.iter().map(|s| s.param).collect()
    }

    /// Update one stage's settings; the previous filter stays active on error.
    ///
    /// The replacement stage is designed and validated before anything is
    /// swapped, and starts with invalidated history so it re-primes from the
    /// live signal.
    pub fn set_param(&mut self, param: FilterParam) -> ScopeResult<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.param.kind == param.kind)
            .ok_or_else(|| {
                ScopeError::precondition(format!("no {:?} stage in this chain", param.kind))
            })?;
        let stage = FilterStage::new(param.kind, param.cutoff_hz, self.sample_rate_hz)?;
        debug!(kind = ?param.kind, enabled = param.enabled, cutoff_hz = param.cutoff_hz, "filter stage updated");
        slot.param = param;
        slot.stage = stage;
        Ok(())
    }

    /// Redesign every stage for a new sampling rate; history is discarded.
    pub fn set_sample_rate(&mut self, sample_rate_hz: f32) -> ScopeResult<()> {
        let mut rebuilt = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            rebuilt.push(ChainSlot {
                param: slot.param,
                stage: FilterStage::new(slot.param.kind, slot.param.cutoff_hz, sample_rate_hz)?,
            });
        }
        self.slots = rebuilt;
        self.sample_rate_hz = sample_rate_hz;
        Ok(())
    }

    /// Discard all stage history, e.g. after the channel selection changed.
    pub fn invalidate(&mut self) {
        for slot in &mut self.slots {
            slot.stage.invalidate();
        }
    }

    /// Run all enabled stages in order over interleaved frames, in place.
    pub fn apply(&mut self, samples: &mut [f32], channels: usize) {
        for slot in &mut self.slots {
            if slot.param.enabled {
                slot.stage.process(samples, channels);
            }
        }
    }

    /// Tracked per-channel offsets from the offset-removal stage, if present.
    pub fn offsets(&self) -> Option<&[f32]> {
        self.slots
            .iter()
            .find(|s| s.param.kind == StageKind::OffsetRemoval)
            .map(|s| s.stage.baseline())
    }
}
