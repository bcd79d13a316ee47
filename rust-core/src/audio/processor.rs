//! Block processor - filters, weights and mixes the three bands
//!
//! Each band keeps its own streaming filter, so consecutive blocks form one
//! continuous convolution. Output is normalized to peak 1.0 when it would
//! clip, and replaced by silence if it is not finite.

use super::gain::GainStage;
use crate::config::NUM_BANDS;
use crate::filters::{Band, FastFirFilter, FilterBank, FirFilter};

/// Filters longer than this use FFT-based convolution
pub const FAST_FIR_THRESHOLD: usize = 128;

/// Trait for polymorphic filter types with zero-allocation in-place processing
trait FilterTrait {
    fn process_block_inplace(&mut self, buffer: &mut [f64]);
    fn reset(&mut self);
}

impl FilterTrait for FirFilter {
    fn process_block_inplace(&mut self, buffer: &mut [f64]) {
        FirFilter::process_block_inplace(self, buffer)
    }

    fn reset(&mut self) {
        FirFilter::reset(self)
    }
}

impl FilterTrait for FastFirFilter {
    fn process_block_inplace(&mut self, buffer: &mut [f64]) {
        FastFirFilter::process_block_inplace(self, buffer)
    }

    fn reset(&mut self) {
        FastFirFilter::reset(self)
    }
}

/// Streaming three-band processor
pub struct BlockProcessor {
    /// One filter per band, in band order
    filters: Vec<Box<dyn FilterTrait + Send>>,

    /// Shared gains, read once per block
    gains: GainStage,

    /// Per-band work buffer
    scratch: Vec<f64>,

    /// Blocks replaced by silence because the output was not finite
    faults: u64,
}

impl BlockProcessor {
    /// Create a processor for blocks of (typically) `block_size` samples
    ///
    /// Longer blocks are accepted and processed in `block_size` pieces.
    pub fn new(bank: &FilterBank, gains: GainStage, block_size: usize) -> Self {
        let block_size = block_size.max(1);

        let filters = Band::ALL
            .iter()
            .map(|&band| {
                let coeffs = bank.coefficients(band).to_vec();
                let filter: Box<dyn FilterTrait + Send> = if coeffs.len() > FAST_FIR_THRESHOLD {
                    Box::new(FastFirFilter::new(coeffs, block_size))
                } else {
                    Box::new(FirFilter::new(coeffs))
                };
                filter
            })
            .collect();

        Self {
            filters,
            gains,
            scratch: vec![0.0; block_size],
            faults: 0,
        }
    }

    /// Process `block` into `output` (no allocations)
    ///
    /// Both slices are expected to have the same length; only the common
    /// prefix is written otherwise.
    pub fn process(&mut self, block: &[f64], output: &mut [f64]) {
        let n = block.len().min(output.len());
        let output = &mut output[..n];
        let block = &block[..n];

        let gains: [f64; NUM_BANDS] = self.gains.gains();
        output.fill(0.0);

        let step = self.scratch.len();
        for start in (0..n).step_by(step) {
            let end = (start + step).min(n);
            let len = end - start;

            for (filter, &gain) in self.filters.iter_mut().zip(gains.iter()) {
                let scratch = &mut self.scratch[..len];
                scratch.copy_from_slice(&block[start..end]);
                filter.process_block_inplace(scratch);

                for (out, &y) in output[start..end].iter_mut().zip(scratch.iter()) {
                    *out += y * gain;
                }
            }
        }

        let peak = output.iter().fold(0.0f64, |peak, &y| peak.max(y.abs()));

        if !peak.is_finite() || output.iter().any(|y| y.is_nan()) {
            // Poisoned history would keep producing garbage
            output.fill(0.0);
            self.reset();
            self.faults += 1;
        } else if peak > 1.0 {
            for y in output.iter_mut() {
                *y /= peak;
            }
        }
    }

    /// Process a block, returning a new buffer of the same length
    pub fn process_block(&mut self, block: &[f64]) -> Vec<f64> {
        let mut output = vec![0.0; block.len()];
        self.process(block, &mut output);
        output
    }

    /// Clear all filter history
    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset();
        }
    }

    /// Number of blocks replaced by silence
    pub fn faults(&self) -> u64 {
        self.faults
    }

    /// Gain stage read by this processor
    pub fn gains(&self) -> &GainStage {
        &self.gains
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EqualizerConfig;
    use std::f64::consts::PI;

    const FS: f64 = 44100.0;

    fn default_bank() -> FilterBank {
        FilterBank::from_config(&EqualizerConfig::default()).unwrap()
    }

    /// Deterministic white noise in [-amplitude, amplitude]
    fn white_noise(len: usize, amplitude: f64) -> Vec<f64> {
        let mut state: u64 = 0xDEAD_BEEF_CAFE_BABE;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                amplitude * ((state >> 33) as i32) as f64 / i32::MAX as f64
            })
            .collect()
    }

    fn tones(freqs: &[f64], amplitude: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                freqs
                    .iter()
                    .map(|f| amplitude * (2.0 * PI * f * n as f64 / FS).sin())
                    .sum()
            })
            .collect()
    }

    fn chunked(processor: &mut BlockProcessor, input: &[f64], chunk: usize) -> Vec<f64> {
        let mut output = Vec::with_capacity(input.len());
        for block in input.chunks(chunk) {
            output.extend(processor.process_block(block));
        }
        output
    }

    #[test]
    fn test_output_length_matches_input() {
        let mut processor = BlockProcessor::new(&default_bank(), GainStage::default(), 1024);
        for len in [0, 1, 100, 1024, 3000] {
            assert_eq!(processor.process_block(&vec![0.1; len]).len(), len);
        }
    }

    #[test]
    fn test_chunked_matches_single_call() {
        let bank = default_bank();
        let input = tones(&[150.0, 900.0, 7000.0], 0.15, 10_000);

        let mut whole = BlockProcessor::new(&bank, GainStage::default(), 1024);
        let expected = whole.process_block(&input);

        let mut streaming = BlockProcessor::new(&bank, GainStage::default(), 1024);
        let output = chunked(&mut streaming, &input, 1024);

        assert_eq!(expected.len(), output.len());
        for (i, (a, b)) in expected.iter().zip(output.iter()).enumerate() {
            assert!((a - b).abs() < 1e-12, "Mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_chunked_matches_single_call_with_fft_convolution() {
        let config = EqualizerConfig { num_taps: 401, ..Default::default() };
        let bank = FilterBank::from_config(&config).unwrap();
        let input = tones(&[150.0, 900.0, 7000.0], 0.15, 6000);

        let mut whole = BlockProcessor::new(&bank, GainStage::default(), 512);
        let expected = whole.process_block(&input);

        let mut streaming = BlockProcessor::new(&bank, GainStage::default(), 512);
        let output = chunked(&mut streaming, &input, 300);

        for (i, (a, b)) in expected.iter().zip(output.iter()).enumerate() {
            assert!((a - b).abs() < 1e-9, "Mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_fft_path_matches_direct_path() {
        let config = EqualizerConfig { num_taps: 201, ..Default::default() };
        let bank = FilterBank::from_config(&config).unwrap();
        let input = white_noise(4096, 0.2);

        let mut fast = BlockProcessor::new(&bank, GainStage::default(), 1024);
        let fast_output = chunked(&mut fast, &input, 1024);

        // Reference: direct convolution per band
        let mut expected = vec![0.0; input.len()];
        for band in Band::ALL {
            let mut filter = FirFilter::new(bank.coefficients(band).to_vec());
            for (e, y) in expected.iter_mut().zip(filter.process_block(&input)) {
                *e += y;
            }
        }
        let peak = expected.iter().fold(0.0f64, |p, y| p.max(y.abs()));
        assert!(peak <= 1.0);

        for (a, b) in fast_output.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_output_never_exceeds_unity() {
        let gains = GainStage::default();
        for band in 0..3 {
            gains.set_gain_db(band, 12.0).unwrap();
        }

        let mut processor = BlockProcessor::new(&default_bank(), gains, 1024);
        let input = white_noise(1024 * 8, 10.0);

        for block in input.chunks(1024) {
            let output = processor.process_block(block);
            let peak = output.iter().fold(0.0f64, |p, y| p.max(y.abs()));
            assert!(peak <= 1.0, "peak {}", peak);
        }
    }

    #[test]
    fn test_gain_scales_band() {
        let bank = default_bank();
        let input = tones(&[10_000.0], 0.2, 8192);

        let mut flat = BlockProcessor::new(&bank, GainStage::default(), 1024);
        let reference = chunked(&mut flat, &input, 1024);

        let gains = GainStage::default();
        gains.set_gain_db(2, -12.0).unwrap();
        let mut cut = BlockProcessor::new(&bank, gains, 1024);
        let output = chunked(&mut cut, &input, 1024);

        let rms = |x: &[f64]| (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt();
        let ratio = rms(&output[1024..]) / rms(&reference[1024..]);
        assert!((ratio - 10f64.powf(-0.6)).abs() < 0.01, "ratio {}", ratio);
    }

    #[test]
    fn test_gain_change_applies_to_next_block() {
        let gains = GainStage::default();
        let mut processor = BlockProcessor::new(&default_bank(), gains.clone(), 1024);
        let input = tones(&[1000.0], 0.2, 1024);

        let before = processor.process_block(&input);
        gains.set_gain_db(1, -12.0).unwrap();
        let after = processor.process_block(&input);

        let energy = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>();
        assert!(energy(&after) < energy(&before) * 0.2);
    }

    #[test]
    fn test_non_finite_input_becomes_silence() {
        let mut processor = BlockProcessor::new(&default_bank(), GainStage::default(), 256);

        let mut bad = vec![0.1; 256];
        bad[10] = f64::NAN;
        let output = processor.process_block(&bad);

        assert!(output.iter().all(|&y| y == 0.0));
        assert_eq!(processor.faults(), 1);

        // History was cleared, so the next block is clean
        let output = processor.process_block(&vec![0.1; 256]);
        assert!(output.iter().all(|y| y.is_finite()));
        assert_eq!(processor.faults(), 1);
    }
}
