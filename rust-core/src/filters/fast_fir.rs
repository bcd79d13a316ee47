//! FFT-based fast convolution for long FIR filters
//!
//! Overlap-add with frequency-domain multiplication.
//! Complexity: O(N log N) vs O(N*M) for time-domain

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT-based FIR filter for long impulse responses
///
/// Produces the same output as [`super::FirFilter`] for the same coefficients;
/// the convolution tail is carried between blocks.
pub struct FastFirFilter {
    /// Filter coefficients in frequency domain
    h_fft: Vec<Complex<f64>>,

    /// FFT size (power of 2, >= block_size + filter_length - 1)
    fft_size: usize,

    /// Largest segment transformed at once
    block_size: usize,

    /// Filter length
    filter_length: usize,

    /// Convolution tail from previous segments (filter_length - 1 samples)
    overlap: Vec<f64>,

    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,

    /// Reusable buffers
    work: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl FastFirFilter {
    /// Create new FFT-based filter
    ///
    /// # Arguments
    /// * `coefficients` - Filter coefficients h[n]
    /// * `block_size` - Segment size (e.g., 1024); longer inputs are split
    pub fn new(coefficients: Vec<f64>, block_size: usize) -> Self {
        let filter_length = coefficients.len();
        assert!(filter_length > 0, "FIR filter needs at least one coefficient");
        let block_size = block_size.max(1);

        let fft_size = (block_size + filter_length - 1).next_power_of_two();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let mut h_fft = vec![Complex::new(0.0, 0.0); fft_size];
        for (slot, &coeff) in h_fft.iter_mut().zip(coefficients.iter()) {
            *slot = Complex::new(coeff, 0.0);
        }
        fft.process(&mut h_fft);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        Self {
            h_fft,
            fft_size,
            block_size,
            filter_length,
            overlap: vec![0.0; filter_length - 1],
            fft,
            ifft,
            work: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Process a block, returning a new buffer of the same length
    pub fn process_block(&mut self, input: &[f64]) -> Vec<f64> {
        let mut output = input.to_vec();
        self.process_block_inplace(&mut output);
        output
    }

    /// Process a block in-place (no allocations)
    pub fn process_block_inplace(&mut self, buffer: &mut [f64]) {
        for segment in buffer.chunks_mut(self.block_size) {
            self.process_segment(segment);
        }
    }

    fn process_segment(&mut self, segment: &mut [f64]) {
        let n = segment.len();
        let tail = self.filter_length - 1;

        // 1. Zero-padded input
        for (slot, &x) in self.work.iter_mut().zip(segment.iter()) {
            *slot = Complex::new(x, 0.0);
        }
        self.work[n..].fill(Complex::new(0.0, 0.0));

        // 2. Convolution via frequency-domain multiplication
        self.fft.process_with_scratch(&mut self.work, &mut self.scratch);
        for (x, h) in self.work.iter_mut().zip(self.h_fft.iter()) {
            *x *= *h;
        }
        self.ifft.process_with_scratch(&mut self.work, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f64;

        // 3. Overlap-add with the tail of earlier segments
        for (i, sample) in segment.iter_mut().enumerate() {
            let carried = if i < tail { self.overlap[i] } else { 0.0 };
            *sample = self.work[i].re * scale + carried;
        }

        // 4. New tail; reads of overlap[n + j] are ahead of the writes
        for j in 0..tail {
            let carried = if n + j < tail { self.overlap[n + j] } else { 0.0 };
            self.overlap[j] = self.work[n + j].re * scale + carried;
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.overlap.fill(0.0);
    }

    /// Get filter length
    pub fn filter_length(&self) -> usize {
        self.filter_length
    }

    /// Get segment size
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
