// src/processing/stage.rs
//! Digital filter stages with cross-chunk state continuity
//!
//! A [`FilterStage`] is one FIR/IIR filter applied independently per channel:
//! `y[n] = sum(b[k] * x[n-k]) - sum(a[k] * y[n-k], k >= 1)` with `a[0] = 1`.
//! History outlives the processing call, so the output is identical no matter
//! how the caller chunks the input stream. After a parameter change the stage
//! re-primes from the first incoming sample instead of replaying a start-up
//! transient into the display.

use serde::{Deserialize, Serialize};

use crate::error::{ScopeError, ScopeResult};

/// Filter stage kinds used by the display chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Slow baseline tracker; output is input minus the tracked offset
    OffsetRemoval,
    /// Butterworth-style lowpass biquad
    Lowpass,
    /// Butterworth-style highpass biquad
    Highpass,
    /// Fixed 50 Hz line-noise notch
    Notch50,
    /// Fixed 60 Hz line-noise notch
    Notch60,
    /// Moving-average FIR with equal taps summing to 1
    MovingAverage,
}

/// User-facing settings for one stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParam {
    /// Which filter this parametrizes
    pub kind: StageKind,
    /// Disabled stages pass samples through untouched
    pub enabled: bool,
    /// Cutoff frequency in Hz; ignored by the fixed notches
    pub cutoff_hz: f32,
}

impl FilterParam {
    /// A disabled stage of the given kind with a sensible default cutoff.
    pub fn disabled(kind: StageKind) -> Self {
        let cutoff_hz = match kind {
            StageKind::OffsetRemoval => 0.5,
            StageKind::Lowpass => 100.0,
            StageKind::Highpass => 1.0,
            StageKind::Notch50 => 50.0,
            StageKind::Notch60 => 60.0,
            StageKind::MovingAverage => 40.0,
        };
        Self {
            kind,
            enabled: false,
            cutoff_hz,
        }
    }
}

// Reference notch biquads, feedforward (b) then feedback (a, a[0] = 1).
const NOTCH_50_B: [f32; 3] = [0.981497025475108, -1.939170825861565, 0.981497025475108];
const NOTCH_50_A: [f32; 3] = [1.0, -1.939170825861565, 0.962994050950216];
const NOTCH_60_B: [f32; 3] = [0.981497025475108, -1.928566634775778, 0.981497025475108];
const NOTCH_60_A: [f32; 3] = [1.0, -1.928566634775778, 0.962994050950216];

/// One digital filter with persistent per-channel history
#[derive(Debug, Clone)]
pub struct FilterStage {
    kind: StageKind,
    /// Feedforward taps
    b: Vec<f32>,
    /// Feedback taps, `a[0] == 1`
    a: Vec<f32>,
    /// Per-channel input history, newest first, `b.len() - 1` samples
    x_hist: Vec<Vec<f32>>,
    /// Per-channel output history, newest first, `a.len() - 1` samples
    y_hist: Vec<Vec<f32>>,
    /// Baseline tracked by the offset-removal kind, per channel
    baseline: Vec<f32>,
    /// Smoothing constant for the baseline tracker
    baseline_alpha: f32,
    needs_priming: bool,
}

fn validate_cutoff(kind: StageKind, cutoff_hz: f32, sample_rate_hz: f32) -> ScopeResult<()> {
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(ScopeError::invalid_filter(
            "sampling rate must be positive",
            cutoff_hz,
            sample_rate_hz,
        ));
    }
    match kind {
        StageKind::Notch50 | StageKind::Notch60 => Ok(()),
        _ => {
            if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
                Err(ScopeError::invalid_filter(
                    "cutoff must be positive",
                    cutoff_hz,
                    sample_rate_hz,
                ))
            } else if cutoff_hz >= sample_rate_hz / 2.0 {
                Err(ScopeError::invalid_filter(
                    "cutoff at or above Nyquist",
                    cutoff_hz,
                    sample_rate_hz,
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Butterworth-style biquad via the bilinear transform, Q = 1/sqrt(2).
fn biquad(cutoff_hz: f32, sample_rate_hz: f32, highpass: bool) -> (Vec<f32>, Vec<f32>) {
    let omega = 2.0 * std::f32::consts::PI * cutoff_hz / sample_rate_hz;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / std::f32::consts::SQRT_2;

    let a0 = 1.0 + alpha;
    let a = vec![1.0, -2.0 * cos_omega / a0, (1.0 - alpha) / a0];
    let b = if highpass {
        vec![
            (1.0 + cos_omega) / (2.0 * a0),
            -(1.0 + cos_omega) / a0,
            (1.0 + cos_omega) / (2.0 * a0),
        ]
    } else {
        vec![
            (1.0 - cos_omega) / (2.0 * a0),
            (1.0 - cos_omega) / a0,
            (1.0 - cos_omega) / (2.0 * a0),
        ]
    };
    (b, a)
}

impl FilterStage {
    /// Design a stage for the given sampling rate.
    pub fn new(kind: StageKind, cutoff_hz: f32, sample_rate_hz: f32) -> ScopeResult<Self> {
        validate_cutoff(kind, cutoff_hz, sample_rate_hz)?;

        let mut baseline_alpha = 0.0;
        let (b, a) = match kind {
            StageKind::OffsetRemoval => {
                // One-pole tracker; the IIR taps are unused, the baseline
                // update below is the whole filter.
                baseline_alpha =
                    1.0 - (-2.0 * std::f32::consts::PI * cutoff_hz / sample_rate_hz).exp();
                (vec![1.0], vec![1.0])
            }
            StageKind::Lowpass => biquad(cutoff_hz, sample_rate_hz, false),
            StageKind::Highpass => biquad(cutoff_hz, sample_rate_hz, true),
            StageKind::Notch50 => (NOTCH_50_B.to_vec(), NOTCH_50_A.to_vec()),
            StageKind::Notch60 => (NOTCH_60_B.to_vec(), NOTCH_60_A.to_vec()),
            StageKind::MovingAverage => {
                // Tap count chosen so the first spectral null lands near the
                // requested cutoff.
                let taps = ((sample_rate_hz / cutoff_hz).round() as usize).max(1);
                (vec![1.0 / taps as f32; taps], vec![1.0])
            }
        };

        if b.iter().chain(a.iter()).any(|c| !c.is_finite()) {
            return Err(ScopeError::invalid_filter(
                "non-finite filter coefficient",
                cutoff_hz,
                sample_rate_hz,
            ));
        }
        if b.iter().sum::<f32>() == 0.0 && a.len() == 1 {
            return Err(ScopeError::invalid_filter(
                "degenerate FIR tap sum of zero",
                cutoff_hz,
                sample_rate_hz,
            ));
        }

        Ok(Self {
            kind,
            b,
            a,
            x_hist: Vec::new(),
            y_hist: Vec::new(),
            baseline: Vec::new(),
            baseline_alpha,
            needs_priming: true,
        })
    }

    /// Stage kind
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Per-channel history length carried across calls
    pub fn history_len(&self) -> usize {
        self.b.len().max(self.a.len()) - 1
    }

    /// Discard history and re-prime from the next incoming sample.
    pub fn invalidate(&mut self) {
        self.x_hist.clear();
        self.y_hist.clear();
        self.baseline.clear();
        self.needs_priming = true;
    }

    /// Tracked per-channel baseline (offset-removal kind only).
    pub fn baseline(&self) -> &[f32] {
        &self.baseline
    }

    fn ensure_channels(&mut self, channels: usize) {
        while self.x_hist.len() < channels {
            self.x_hist.push(vec![0.0; self.b.len().saturating_sub(1)]);
            self.y_hist.push(vec![0.0; self.a.len().saturating_sub(1)]);
            self.baseline.push(0.0);
        }
    }

    /// Seed history as if the filter had run at steady state on `samples[0..channels]`.
    fn prime(&mut self, samples: &[f32], channels: usize) {
        let dc_gain = {
            let num: f32 = self.b.iter().sum();
            let den: f32 = self.a.iter().sum();
            if den == 0.0 { 0.0 } else { num / den }
        };
        for ch in 0..channels {
            let x0 = samples[ch];
            self.x_hist[ch].fill(x0);
            self.y_hist[ch].fill(x0 * dc_gain);
            self.baseline[ch] = x0;
        }
        self.needs_priming = false;
    }

    /// Filter `samples` in place: interleaved frames of `channels` values.
    pub fn process(&mut self, samples: &mut [f32], channels: usize) {
        if channels == 0 || samples.is_empty() {
            return;
        }
        debug_assert_eq!(samples.len() % channels, 0);
        self.ensure_channels(channels);
        if self.needs_priming {
            self.prime(samples, channels);
        }

        if self.kind == StageKind::OffsetRemoval {
            for frame in samples.chunks_exact_mut(channels) {
                for (ch, x) in frame.iter_mut().enumerate() {
                    self.baseline[ch] += self.baseline_alpha * (*x - self.baseline[ch]);
                    *x -= self.baseline[ch];
                }
            }
            return;
        }

        for frame in samples.chunks_exact_mut(channels) {
            for (ch, x) in frame.iter_mut().enumerate() {
                let x0 = *x;
                let mut y = self.b[0] * x0;
                for (k, tap) in self.b.iter().enumerate().skip(1) {
                    y += tap * self.x_hist[ch][k - 1];
                }
                for (k, tap) in self.a.iter().enumerate().skip(1) {
                    y -= tap * self.y_hist[ch][k - 1];
                }

                let xh = &mut self.x_hist[ch];
                if !xh.is_empty() {
                    xh.rotate_right(1);
                    xh[0] = x0;
                }
                let yh = &mut self.y_hist[ch];
                if !yh.is_empty() {
                    yh.rotate_right(1);
                    yh[0] = y;
                }
                *x = y;
            }
        }
    }
}
