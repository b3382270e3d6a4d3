//! Property-based tests for chunk-size independence.
//!
//! The display pipeline must produce bit-for-bit identical output no matter
//! how an input stream is sliced into ingest calls. Filter state, decimation
//! phase, and the window pointer all carry across chunk boundaries, so any
//! split of the same stream has to land in the same place.

use proptest::prelude::*;

use exg_scope::{
    FilterChain, FilterParam, ReferenceConfig, ScopeConfig, ScopePipeline, SignalKind, StageKind,
};

/// Cut `total` frames into chunk lengths derived from proptest's split points.
fn chunk_lengths(total: usize, splits: &[usize]) -> Vec<usize> {
    let mut cuts: Vec<usize> = splits.iter().map(|s| s % total).collect();
    cuts.push(0);
    cuts.push(total);
    cuts.sort_unstable();
    cuts.dedup();
    cuts.windows(2).map(|w| w[1] - w[0]).collect()
}

fn scenario_config(channels: usize, sample_rate_hz: f32, decimation: usize) -> ScopeConfig {
    let mut cfg = ScopeConfig::default();
    cfg.acquisition.device_channels = channels;
    cfg.acquisition.sample_rate_hz = sample_rate_hz;
    cfg.display.window_seconds = 2.0;
    cfg.display.decimation = decimation;
    cfg.selection = (0..channels).collect();
    cfg.reference = ReferenceConfig::None;
    cfg
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A filter chain fed one sample run in arbitrary slices produces the
    /// same output as the chain fed the whole run at once.
    #[test]
    fn chain_output_is_split_invariant(
        input in prop::collection::vec(-50.0f32..50.0, 64..512),
        splits in prop::collection::vec(1usize..4096, 0..8),
        enable_lowpass in any::<bool>(),
        enable_offset in any::<bool>(),
    ) {
        let params = vec![
            FilterParam {
                kind: StageKind::OffsetRemoval,
                enabled: enable_offset,
                cutoff_hz: 0.5,
            },
            FilterParam {
                kind: StageKind::Lowpass,
                enabled: enable_lowpass,
                cutoff_hz: 40.0,
            },
            FilterParam {
                kind: StageKind::Notch50,
                enabled: true,
                cutoff_hz: 50.0,
            },
        ];

        let mut whole = input.clone();
        let mut one_shot = FilterChain::new(&params, 500.0).unwrap();
        one_shot.apply(&mut whole, 1);

        let mut pieces = input.clone();
        let mut incremental = FilterChain::new(&params, 500.0).unwrap();
        let mut offset = 0;
        for len in chunk_lengths(input.len(), &splits) {
            incremental.apply(&mut pieces[offset..offset + len], 1);
            offset += len;
        }

        for (i, (a, b)) in whole.iter().zip(&pieces).enumerate() {
            prop_assert_eq!(
                a.to_bits(),
                b.to_bits(),
                "sample {} diverged: one-shot {} vs chunked {}",
                i, a, b
            );
        }
    }

    /// Ingesting a stream through the pipeline in arbitrary chunks leaves the
    /// window pointer and contents identical to a single ingest call, with
    /// filtering and decimation active.
    #[test]
    fn pipeline_window_is_split_invariant(
        seed in any::<u64>(),
        splits in prop::collection::vec(1usize..4096, 0..6),
        decimation in 1usize..4,
    ) {
        use rand::{Rng, SeedableRng};
        let channels = 3;
        let frames = 800;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let stream: Vec<f32> = (0..frames * channels)
            .map(|_| rng.gen_range(-200.0f32..200.0))
            .collect();

        let cfg = scenario_config(channels, 500.0, decimation);
        let reference = ScopePipeline::new(&cfg).unwrap();
        reference.set_filter(SignalKind::Exg, FilterParam {
            kind: StageKind::Highpass,
            enabled: true,
            cutoff_hz: 1.0,
        }).unwrap();
        reference.ingest(SignalKind::Exg, &stream).unwrap();

        let chunked = ScopePipeline::new(&cfg).unwrap();
        chunked.set_filter(SignalKind::Exg, FilterParam {
            kind: StageKind::Highpass,
            enabled: true,
            cutoff_hz: 1.0,
        }).unwrap();
        let mut offset = 0;
        for len in chunk_lengths(frames, &splits) {
            let span = len * channels;
            chunked.ingest(SignalKind::Exg, &stream[offset..offset + span]).unwrap();
            offset += span;
        }

        prop_assert_eq!(
            reference.current_pointer(SignalKind::Exg),
            chunked.current_pointer(SignalKind::Exg)
        );
        prop_assert_eq!(
            reference.frames_ingested(SignalKind::Exg),
            chunked.frames_ingested(SignalKind::Exg)
        );

        let a = reference.snapshot(SignalKind::Exg);
        let b = chunked.snapshot(SignalKind::Exg);
        prop_assert_eq!(a.samples.len(), b.samples.len());
        for (i, (x, y)) in a.samples.iter().zip(&b.samples).enumerate() {
            prop_assert_eq!(
                x.to_bits(),
                y.to_bits(),
                "window sample {} diverged: {} vs {}",
                i, x, y
            );
        }
    }

    /// Common-average referencing is a per-frame operation, so it is chunk
    /// invariant by construction. Verify anyway with the full pipeline since
    /// routing shares scratch buffers across sub-chunks.
    #[test]
    fn referencing_is_split_invariant(
        seed in any::<u64>(),
        splits in prop::collection::vec(1usize..1024, 0..5),
    ) {
        use rand::{Rng, SeedableRng};
        let channels = 4;
        let frames = 300;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let stream: Vec<f32> = (0..frames * channels)
            .map(|_| rng.gen_range(-10.0f32..10.0))
            .collect();

        let mut cfg = scenario_config(channels, 250.0, 1);
        cfg.reference = ReferenceConfig::CommonAverageFull;

        let reference = ScopePipeline::new(&cfg).unwrap();
        reference.ingest(SignalKind::Exg, &stream).unwrap();

        let chunked = ScopePipeline::new(&cfg).unwrap();
        let mut offset = 0;
        for len in chunk_lengths(frames, &splits) {
            let span = len * channels;
            chunked.ingest(SignalKind::Exg, &stream[offset..offset + span]).unwrap();
            offset += span;
        }

        let a = reference.snapshot(SignalKind::Exg);
        let b = chunked.snapshot(SignalKind::Exg);
        prop_assert_eq!(a.samples, b.samples);
    }
}
