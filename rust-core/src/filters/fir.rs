//! Streaming FIR filter with carried history
//!
//! Direct convolution over a mirrored delay line: the last M inputs are
//! always contiguous in memory, so each output is one dot product and the
//! history survives between blocks.

/// Real-time FIR filter processor with zero-allocation delay line
pub struct FirFilter {
    /// Filter coefficients h[n]
    coefficients: Vec<f64>,

    /// Delay line stored twice (length 2*M); delay[cursor + k] = x[n - k]
    delay: Vec<f64>,

    /// Position of the newest sample
    cursor: usize,

    /// Filter length
    length: usize,
}

impl FirFilter {
    /// Create a new FIR filter with given coefficients
    ///
    /// # Panics
    /// If `coefficients` is empty
    pub fn new(coefficients: Vec<f64>) -> Self {
        let length = coefficients.len();
        assert!(length > 0, "FIR filter needs at least one coefficient");

        Self {
            coefficients,
            delay: vec![0.0; 2 * length],
            cursor: 0,
            length,
        }
    }

    /// Process single sample
    #[inline]
    pub fn process_sample(&mut self, input: f64) -> f64 {
        self.cursor = if self.cursor == 0 { self.length - 1 } else { self.cursor - 1 };
        self.delay[self.cursor] = input;
        self.delay[self.cursor + self.length] = input;

        // y[n] = Σ h[k] * x[n-k]
        let history = &self.delay[self.cursor..self.cursor + self.length];
        self.coefficients
            .iter()
            .zip(history)
            .map(|(&h, &x)| h * x)
            .sum()
    }

    /// Process a block of samples, returning a new buffer of the same length
    pub fn process_block(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process_sample(x)).collect()
    }

    /// Process a block in-place
    pub fn process_block_inplace(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset filter state (clear delay line)
    pub fn reset(&mut self) {
        self.delay.fill(0.0);
        self.cursor = 0;
    }

    /// Get filter coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Get filter length
    pub fn length(&self) -> usize {
        self.length
    }

    /// Group delay in samples (linear phase Type I FIR)
    pub fn group_delay_samples(&self) -> f64 {
        (self.length - 1) as f64 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fir_filter_basic() {
        // 3-tap moving average
        let mut filter = FirFilter::new(vec![1.0 / 3.0; 3]);

        let outputs: Vec<f64> = [3.0, 0.0, 0.0, 0.0].iter().map(|&x| filter.process_sample(x)).collect();

        assert!((outputs[0] - 1.0).abs() < 1e-10);
        assert!((outputs[1] - 1.0).abs() < 1e-10);
        assert!((outputs[2] - 1.0).abs() < 1e-10);
        assert!(outputs[3].abs() < 1e-10);
    }

    #[test]
    fn test_fir_filter_block_processing() {
        let mut filter = FirFilter::new(vec![0.5, 0.5]);

        let output = filter.process_block(&[1.0, 2.0, 3.0, 4.0]);

        let expected = [0.5, 1.5, 2.5, 3.5];
        assert_eq!(output.len(), 4);
        for (y, e) in output.iter().zip(expected.iter()) {
            assert!((y - e).abs() < 1e-10);
        }
    }

    #[test]
    fn test_history_carries_across_blocks() {
        let coeffs = vec![0.1, -0.2, 0.3, 0.4, -0.5];
        let input: Vec<f64> = (0..50).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();

        let mut whole = FirFilter::new(coeffs.clone());
        let expected = whole.process_block(&input);

        let mut chunked = FirFilter::new(coeffs);
        let mut output = Vec::new();
        for chunk in input.chunks(3) {
            output.extend(chunked.process_block(chunk));
        }

        for (i, (a, b)) in expected.iter().zip(output.iter()).enumerate() {
            assert!((a - b).abs() < 1e-12, "Mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_fir_filter_reset() {
        let mut filter = FirFilter::new(vec![1.0, 1.0]);

        filter.process_sample(1.0);
        filter.process_sample(2.0);
        filter.reset();

        // Next output should be as if starting fresh
        let output = filter.process_sample(1.0);
        assert!((output - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_delay_line_wraparound() {
        // Tap first and fourth samples
        let mut filter = FirFilter::new(vec![1.0, 0.0, 0.0, 1.0]);

        for x in [1.0, 2.0, 3.0, 4.0] {
            filter.process_sample(x);
        }

        // h[0]*5 + h[3]*2 = 7
        let output = filter.process_sample(5.0);
        assert!((output - 7.0).abs() < 1e-10);
    }

    #[test]
    fn test_group_delay() {
        let filter = FirFilter::new(vec![0.0; 101]);
        assert_eq!(filter.group_delay_samples(), 50.0);
    }
}
