// src/processing/pipeline.rs
//! Pipeline controller: ingestion, reconfiguration, renderer access
//!
//! [`ScopePipeline`] orchestrates Router -> Chain -> decimation -> window
//! write for every incoming chunk and owns the single lock guarding all
//! mutable display state. The acquisition callback, the renderer timer, and
//! UI reconfiguration calls all serialize through that lock; no state is
//! touched without holding it. Long chunks are split into sub-chunks of at
//! most ~100 ms so the lock is never held across more than one sub-chunk's
//! numeric work.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::buffer::SampleWindow;
use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::processing::chain::FilterChain;
use crate::processing::router::{ChannelRouter, ReferenceConfig};
use crate::processing::stage::FilterParam;

/// Upper bound on lock hold time, expressed as sub-chunk duration
const SUBCHUNK_SECONDS: f32 = 0.1;

/// Distinguishes independent sample streams behind the shared lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Primary electrode stream
    Exg,
    /// Auxiliary sensor stream
    Aux,
}

/// Renderer-facing copy of one window, taken under the pipeline lock
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    /// Next write position at snapshot time
    pub pointer: usize,
    /// Samples per frame
    pub channels: usize,
    /// Retained frames in chronological order, oldest first
    pub samples: Vec<f32>,
}

/// Everything one stream owns: routing, filtering, storage, scratch space
struct StreamState {
    router: ChannelRouter,
    chain: FilterChain,
    window: SampleWindow,
    sample_rate_hz: f32,
    /// Frames until the stride decimator keeps the next frame
    decim_phase: usize,
    frames_ingested: u64,
    /// Scratch for routed/referenced frames, reused across calls
    routed: Vec<f32>,
    /// Scratch for decimated frames, reused across calls
    kept: Vec<f32>,
}

impl StreamState {
    fn empty(sample_rate_hz: f32, window_seconds: f32, decimation: usize) -> ScopeResult<Self> {
        let capacity = window_capacity(window_seconds, sample_rate_hz, decimation);
        Ok(Self {
            router: ChannelRouter::new(Vec::new()),
            chain: FilterChain::display_default(sample_rate_hz)?,
            window: SampleWindow::new(capacity, 0)?,
            sample_rate_hz,
            decim_phase: 0,
            frames_ingested: 0,
            routed: Vec::new(),
            kept: Vec::new(),
        })
    }

    fn subchunk_frames(&self) -> usize {
        ((self.sample_rate_hz * SUBCHUNK_SECONDS) as usize).max(1)
    }

    /// Route, filter, decimate and store one sub-chunk of raw frames.
    fn process_subchunk(&mut self, raw: &[f32], decimation: usize) -> ScopeResult<()> {
        let mut routed = std::mem::take(&mut self.routed);
        let result = self.router.select_and_reference(raw, &mut routed);
        self.routed = routed;
        result?;

        let channels = self.router.num_selected();
        let frames = raw.len() / self.router.device_channels();
        if channels > 0 {
            let mut samples = std::mem::take(&mut self.routed);
            self.chain.apply(&mut samples, channels);

            self.kept.clear();
            if decimation == 1 {
                self.kept.extend_from_slice(&samples);
                self.decim_phase = 0;
            } else {
                for frame in samples.chunks_exact(channels) {
                    if self.decim_phase == 0 {
                        self.kept.extend_from_slice(frame);
                    }
                    self.decim_phase = (self.decim_phase + 1) % decimation;
                }
            }
            self.routed = samples;
            let kept = std::mem::take(&mut self.kept);
            let result = self.window.write(&kept);
            self.kept = kept;
            result?;
        }
        self.frames_ingested += frames as u64;
        Ok(())
    }
}

fn window_capacity(window_seconds: f32, sample_rate_hz: f32, decimation: usize) -> usize {
    ((window_seconds * sample_rate_hz / decimation as f32) as usize).max(1)
}

struct Inner {
    exg: StreamState,
    aux: StreamState,
    window_seconds: f32,
    decimation: usize,
}

impl Inner {
    fn stream(&self, kind: SignalKind) -> &StreamState {
        match kind {
            SignalKind::Exg => &self.exg,
            SignalKind::Aux => &self.aux,
        }
    }

    fn stream_mut(&mut self, kind: SignalKind) -> &mut StreamState {
        match kind {
            SignalKind::Exg => &mut self.exg,
            SignalKind::Aux => &mut self.aux,
        }
    }
}

/// Thread-safe display pipeline controller
///
/// Shared as `Arc<ScopePipeline>` between the acquisition thread (producer),
/// the renderer timer (consumer), and UI glue (reconfiguration). Teardown is
/// ownership-based: the last `Arc` cannot drop while an `ingest` call holds
/// the lock, so in-flight work always completes before state is freed.
pub struct ScopePipeline {
    inner: Mutex<Inner>,
}

impl ScopePipeline {
    /// Build a pipeline from a validated configuration.
    ///
    /// The primary stream is configured from `config`; the auxiliary stream
    /// starts empty until [`define_channels`](Self::define_channels) is
    /// called for it.
    pub fn new(config: &ScopeConfig) -> ScopeResult<Self> {
        config.validate()?;

        let sample_rate = config.acquisition.sample_rate_hz;
        let mut router = ChannelRouter::new(config.acquisition.labels());
        router.set_selection(config.selection.clone())?;
        router.set_reference(config.reference)?;

        let chain = if config.filters.is_empty() {
            FilterChain::display_default(sample_rate)?
        } else {
            FilterChain::new(&config.filters, sample_rate)?
        };

        let capacity = config.window_capacity();
        let window = SampleWindow::new(capacity, router.num_selected())?;

        let exg = StreamState {
            router,
            chain,
            window,
            sample_rate_hz: sample_rate,
            decim_phase: 0,
            frames_ingested: 0,
            routed: Vec::new(),
            kept: Vec::new(),
        };
        let aux = StreamState::empty(
            sample_rate,
            config.display.window_seconds,
            config.display.decimation,
        )?;

        Ok(Self {
            inner: Mutex::new(Inner {
                exg,
                aux,
                window_seconds: config.display.window_seconds,
                decimation: config.display.decimation,
            }),
        })
    }

    /// Ingest raw interleaved device frames from the acquisition source.
    ///
    /// The chunk is processed in sub-chunks of at most ~100 ms; the lock is
    /// released between sub-chunks so renderer and reconfiguration calls are
    /// never starved by a long chunk.
    pub fn ingest(&self, kind: SignalKind, raw: &[f32]) -> ScopeResult<()> {
        let mut offset = 0;
        while offset < raw.len() {
            let mut inner = self.inner.lock();
            let decimation = inner.decimation;
            let stream = inner.stream_mut(kind);

            let device = stream.router.device_channels();
            if device == 0 {
                return Err(ScopeError::precondition(
                    "ingest before define_channels for this stream",
                ));
            }
            if (raw.len() - offset) % device != 0 {
                return Err(ScopeError::precondition(format!(
                    "raw slice length {} is not a multiple of {} device channels",
                    raw.len() - offset,
                    device
                )));
            }

            let take = stream.subchunk_frames() * device;
            let end = (offset + take).min(raw.len());
            stream.process_subchunk(&raw[offset..end], decimation)?;
            trace!(?kind, frames = (end - offset) / device, "sub-chunk processed");
            offset = end;
        }
        Ok(())
    }

    /// Next write position of the stream's window.
    pub fn current_pointer(&self, kind: SignalKind) -> usize {
        self.inner.lock().stream(kind).window.pointer()
    }

    /// Copy the full window contents for rendering.
    ///
    /// The copy happens under the pipeline lock; the caller draws from the
    /// returned snapshot after the lock is released.
    pub fn snapshot(&self, kind: SignalKind) -> WindowSnapshot {
        let inner = self.inner.lock();
        let stream = inner.stream(kind);
        let mut samples = Vec::new();
        stream.window.chronological_into(&mut samples);
        WindowSnapshot {
            pointer: stream.window.pointer(),
            channels: stream.window.channels(),
            samples,
        }
    }

    /// Copy a contiguous logical range of frames (0 = oldest retained).
    pub fn snapshot_range(
        &self,
        kind: SignalKind,
        start: usize,
        count: usize,
    ) -> ScopeResult<WindowSnapshot> {
        let inner = self.inner.lock();
        let stream = inner.stream(kind);
        let (head, tail) = stream.window.logical_range(start, count)?;
        let mut samples = Vec::with_capacity(head.len() + tail.len());
        samples.extend_from_slice(head);
        samples.extend_from_slice(tail);
        Ok(WindowSnapshot {
            pointer: stream.window.pointer(),
            channels: stream.window.channels(),
            samples,
        })
    }

    /// Display labels reflecting the stream's selection and reference mode.
    pub fn channel_labels(&self, kind: SignalKind) -> Vec<String> {
        self.inner.lock().stream(kind).router.channel_labels()
    }

    /// Per-channel baseline from the offset-removal stage, for auxiliary
    /// offset display; empty when the chain has no such stage.
    pub fn last_offset_values(&self, kind: SignalKind) -> Vec<f32> {
        self.inner
            .lock()
            .stream(kind)
            .chain
            .offsets()
            .map(<[f32]>::to_vec)
            .unwrap_or_default()
    }

    /// Total raw frames ingested on this stream.
    pub fn frames_ingested(&self, kind: SignalKind) -> u64 {
        self.inner.lock().stream(kind).frames_ingested
    }

    /// Replace a stream's device channel set.
    ///
    /// Stale selection entries are dropped, the window is rebuilt, and all
    /// filter history is discarded.
    pub fn define_channels(&self, kind: SignalKind, labels: Vec<String>) -> ScopeResult<()> {
        let mut inner = self.inner.lock();
        let (window_seconds, decimation) = (inner.window_seconds, inner.decimation);
        let stream = inner.stream_mut(kind);

        let mut router = stream.router.clone();
        router.define_channels(labels);
        let capacity = window_capacity(window_seconds, stream.sample_rate_hz, decimation);
        let window = SampleWindow::new(capacity, router.num_selected())?;

        info!(?kind, device_channels = router.device_channels(), "device channel set defined");
        stream.router = router;
        stream.window = window;
        stream.chain.invalidate();
        stream.decim_phase = 0;
        Ok(())
    }

    /// Replace a stream's channel selection; window is rebuilt, pointer reset.
    pub fn set_selection(&self, kind: SignalKind, selection: Vec<usize>) -> ScopeResult<()> {
        let mut inner = self.inner.lock();
        let (window_seconds, decimation) = (inner.window_seconds, inner.decimation);
        let stream = inner.stream_mut(kind);

        // Allocate first, then validate, then commit: a failure at any step
        // leaves the previous selection, window, and pointer untouched.
        let capacity = window_capacity(window_seconds, stream.sample_rate_hz, decimation);
        let window = SampleWindow::new(capacity, selection.len())?;
        stream.router.set_selection(selection)?;

        info!(?kind, channels = stream.router.num_selected(), "channel selection changed");
        stream.window = window;
        stream.chain.invalidate();
        stream.decim_phase = 0;
        Ok(())
    }

    /// Change a stream's reference mode; filter history re-primes.
    pub fn set_reference(&self, kind: SignalKind, reference: ReferenceConfig) -> ScopeResult<()> {
        let mut inner = self.inner.lock();
        let stream = inner.stream_mut(kind);
        stream.router.set_reference(reference)?;
        // The referenced signal steps discontinuously; re-prime instead of
        // letting the old history ring through the display.
        stream.chain.invalidate();
        info!(?kind, ?reference, "reference mode changed");
        Ok(())
    }

    /// Update one filter stage; on rejection the previous filter stays active.
    pub fn set_filter(&self, kind: SignalKind, param: FilterParam) -> ScopeResult<()> {
        let mut inner = self.inner.lock();
        inner.stream_mut(kind).chain.set_param(param)
    }

    /// Change the displayed window length; all stream windows are rebuilt.
    pub fn set_window_length(&self, seconds: f32) -> ScopeResult<()> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(ScopeError::precondition("window length must be positive"));
        }
        let mut inner = self.inner.lock();
        let decimation = inner.decimation;

        // Allocate every replacement window before committing any of them.
        let exg = SampleWindow::new(
            window_capacity(seconds, inner.exg.sample_rate_hz, decimation),
            inner.exg.window.channels(),
        )?;
        let aux = SampleWindow::new(
            window_capacity(seconds, inner.aux.sample_rate_hz, decimation),
            inner.aux.window.channels(),
        )?;

        inner.exg.window = exg;
        inner.aux.window = aux;
        inner.window_seconds = seconds;
        info!(seconds, "window length changed");
        Ok(())
    }

    /// Change the stride decimation factor; all stream windows are rebuilt.
    pub fn set_decimation(&self, factor: usize) -> ScopeResult<()> {
        if factor == 0 {
            return Err(ScopeError::precondition("decimation factor must be at least 1"));
        }
        let mut inner = self.inner.lock();
        let seconds = inner.window_seconds;

        let exg = SampleWindow::new(
            window_capacity(seconds, inner.exg.sample_rate_hz, factor),
            inner.exg.window.channels(),
        )?;
        let aux = SampleWindow::new(
            window_capacity(seconds, inner.aux.sample_rate_hz, factor),
            inner.aux.window.channels(),
        )?;

        inner.exg.window = exg;
        inner.aux.window = aux;
        inner.decimation = factor;
        inner.exg.decim_phase = 0;
        inner.aux.decim_phase = 0;
        info!(factor, "decimation changed");
        Ok(())
    }

    /// Change a stream's sampling rate; filters are redesigned and the
    /// window is rebuilt. Fails without mutation if any active cutoff no
    /// longer fits below the new Nyquist frequency.
    pub fn set_sampling_rate(&self, kind: SignalKind, sample_rate_hz: f32) -> ScopeResult<()> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(ScopeError::precondition("sampling rate must be positive"));
        }
        let mut inner = self.inner.lock();
        let (window_seconds, decimation) = (inner.window_seconds, inner.decimation);
        let stream = inner.stream_mut(kind);

        let window = SampleWindow::new(
            window_capacity(window_seconds, sample_rate_hz, decimation),
            stream.window.channels(),
        )?;
        stream.chain.set_sample_rate(sample_rate_hz)?;

        stream.window = window;
        stream.sample_rate_hz = sample_rate_hz;
        stream.decim_phase = 0;
        info!(?kind, sample_rate_hz, "sampling rate changed");
        Ok(())
    }
}
