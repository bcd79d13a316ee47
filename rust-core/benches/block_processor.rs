//! Criterion benchmarks for three-band block processing.

use band_equalizer::{BlockProcessor, EqualizerConfig, FilterBank, GainStage};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const BLOCK_SIZE: usize = 1024;

/// Generate a deterministic white noise buffer using a simple LCG.
fn white_noise(len: usize) -> Vec<f64> {
    let mut state: u64 = 0xDEAD_BEEF_CAFE_BABE;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            0.25 * ((state >> 33) as i32) as f64 / i32::MAX as f64
        })
        .collect()
}

fn bench_block_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_processor");
    let input = white_noise(BLOCK_SIZE);
    let mut output = vec![0.0; BLOCK_SIZE];

    // 101 taps filters directly, 401 and 1001 go through FFT convolution
    for &taps in &[101usize, 401, 1001] {
        let config = EqualizerConfig {
            num_taps: taps,
            block_size: BLOCK_SIZE,
            ..Default::default()
        };
        let bank = FilterBank::from_config(&config).expect("valid bank");

        group.bench_with_input(BenchmarkId::new("process", taps), &taps, |b, _| {
            let gains = GainStage::default();
            gains.set_gain_db(2, -12.0).expect("gain in range");
            let mut processor = BlockProcessor::new(&bank, gains, BLOCK_SIZE);

            for _ in 0..4 {
                processor.process(&input, &mut output);
            }

            b.iter(|| {
                processor.process(black_box(&input), black_box(&mut output));
            });
        });
    }

    group.finish();
}

fn bench_filter_bank_design(c: &mut Criterion) {
    let config = EqualizerConfig::default();
    c.bench_function("filter_bank_design_101", |b| {
        b.iter(|| FilterBank::from_config(black_box(&config)))
    });
}

criterion_group!(benches, bench_block_processor, bench_filter_bank_design);
criterion_main!(benches);
