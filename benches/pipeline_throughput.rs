
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use exg_scope::{
    FilterChain, FilterParam, ReferenceConfig, SampleWindow, ScopeConfig, ScopePipeline,
    SignalKind, StageKind,
};

const SAMPLE_RATES: &[f32] = &[250.0, 500.0, 1000.0];
const CHANNEL_COUNTS: &[usize] = &[1, 4, 8, 16];

fn display_params() -> Vec<FilterParam> {
    vec![
        FilterParam {
            kind: StageKind::OffsetRemoval,
            enabled: true,
            cutoff_hz: 0.5,
        },
        FilterParam {
            kind: StageKind::Highpass,
            enabled: true,
            cutoff_hz: 1.0,
        },
        FilterParam {
            kind: StageKind::Lowpass,
            enabled: true,
            cutoff_hz: 100.0,
        },
        FilterParam {
            kind: StageKind::Notch50,
            enabled: true,
            cutoff_hz: 50.0,
        },
    ]
}

fn scope_config(channels: usize, sample_rate_hz: f32) -> ScopeConfig {
    let mut cfg = ScopeConfig::default();
    cfg.acquisition.device_channels = channels;
    cfg.acquisition.sample_rate_hz = sample_rate_hz;
    cfg.display.window_seconds = 10.0;
    cfg.selection = (0..channels).collect();
    cfg.reference = ReferenceConfig::CommonAverageFull;
    cfg.filters = display_params();
    cfg
}

fn benchmark_window_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_window");

    for &channels in CHANNEL_COUNTS {
        group.throughput(Throughput::Elements(1000));

        group.bench_with_input(
            BenchmarkId::new("write", format!("{}ch", channels)),
            &channels,
            |b, &channels| {
                let mut window = SampleWindow::new(5000, channels).unwrap();
                let chunk = vec![0.5f32; 1000 * channels];

                b.iter(|| {
                    window.write(black_box(&chunk)).unwrap();
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("snapshot", format!("{}ch", channels)),
            &channels,
            |b, &channels| {
                let mut window = SampleWindow::new(5000, channels).unwrap();
                window.write(&vec![0.5f32; 5000 * channels]).unwrap();
                let mut out = Vec::with_capacity(5000 * channels);

                b.iter(|| {
                    window.chronological_into(black_box(&mut out));
                });
            },
        );
    }

    group.finish();
}

fn benchmark_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");

    for &channels in &[1, 8, 16] {
        group.throughput(Throughput::Elements(1000));

        group.bench_with_input(
            BenchmarkId::new("four_stage_apply", format!("{}ch", channels)),
            &channels,
            |b, &channels| {
                let mut chain = FilterChain::new(&display_params(), 500.0).unwrap();
                let mut samples = vec![0.5f32; 1000 * channels];

                b.iter(|| {
                    chain.apply(black_box(&mut samples), channels);
                });
            },
        );
    }

    group.finish();
}

fn benchmark_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_ingest");

    for &sample_rate in SAMPLE_RATES {
        for &channels in CHANNEL_COUNTS {
            let frames = (sample_rate * 0.25) as usize;
            group.throughput(Throughput::Elements((frames * channels) as u64));

            group.bench_with_input(
                BenchmarkId::new(
                    "quarter_second_chunk",
                    format!("{}Hz_{}ch", sample_rate as u32, channels),
                ),
                &(sample_rate, channels),
                |b, &(rate, channels)| {
                    let pipeline = ScopePipeline::new(&scope_config(channels, rate)).unwrap();
                    let chunk: Vec<f32> = (0..frames * channels)
                        .map(|i| ((i % 97) as f32 - 48.0) / 48.0)
                        .collect();

                    b.iter(|| {
                        pipeline
                            .ingest(SignalKind::Exg, black_box(&chunk))
                            .unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmark_snapshot_under_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_snapshot");
    group.sample_size(50);

    group.bench_function("snapshot_8ch_10s", |b| {
        let pipeline = ScopePipeline::new(&scope_config(8, 500.0)).unwrap();
        let chunk = vec![0.5f32; 500 * 8];
        for _ in 0..12 {
            pipeline.ingest(SignalKind::Exg, &chunk).unwrap();
        }

        b.iter(|| {
            let snap = pipeline.snapshot(SignalKind::Exg);
            black_box(snap.pointer);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_window_writes,
    benchmark_filter_chain,
    benchmark_ingest,
    benchmark_snapshot_under_ingest
);
criterion_main!(benches);
