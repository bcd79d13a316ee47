//! FFT engine using realfft for real-valued frames

use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// FFT engine for real-valued signals
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f64>>,

    /// Reusable input buffer
    input_buffer: Vec<f64>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f64>>,

    scratch: Vec<Complex<f64>>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples, at least 2)
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();
        let scratch = r2c.make_scratch_vec();

        Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
            scratch,
        }
    }

    /// Compute FFT and return magnitude spectrum
    ///
    /// # Arguments
    /// * `signal` - Input signal (zero-padded or truncated to fft_size)
    ///
    /// # Returns
    /// Magnitude spectrum |X[k]| for k = 0..=fft_size/2
    pub fn compute_magnitude(&mut self, signal: &[f64]) -> Vec<f64> {
        let copy_len = signal.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&signal[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);

        // Buffer lengths come from the plan, so this cannot fail
        if self
            .r2c
            .process_with_scratch(&mut self.input_buffer, &mut self.output_buffer, &mut self.scratch)
            .is_err()
        {
            return vec![0.0; self.num_bins()];
        }

        self.output_buffer.iter().map(|c| c.norm()).collect()
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Centre frequency of `bin` in Hz
    pub fn bin_to_hz(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.fft_size as f64
    }

    /// Frequency axis in Hz, DC to Nyquist
    pub fn frequency_axis_hz(&self, sample_rate: f64) -> Vec<f64> {
        (0..self.num_bins())
            .map(|bin| self.bin_to_hz(bin, sample_rate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_dc_signal() {
        let mut fft = FftEngine::new(1024);

        // 128 ones zero-padded to 1024: nulls on every 8th bin
        let signal = vec![1.0; 128];
        let spectrum = fft.compute_magnitude(&signal);

        assert!((spectrum[0] - 128.0).abs() < 1e-9);
        for k in [8, 16, 64, 256, 512] {
            assert!(spectrum[k] < 1e-9, "bin {} = {}", k, spectrum[k]);
        }

        // Between nulls the magnitude follows |sin(pi k L / N) / sin(pi k / N)|
        let dirichlet = |k: f64| ((PI * k * 128.0 / 1024.0).sin() / (PI * k / 1024.0).sin()).abs();
        for k in [4, 10, 100] {
            let expected = dirichlet(k as f64);
            assert!((spectrum[k] - expected).abs() < 1e-9, "bin {}: {} vs {}", k, spectrum[k], expected);
        }
    }

    #[test]
    fn test_fft_short_dc_run_leaks_into_bin_10() {
        let mut fft = FftEngine::new(1024);
        let spectrum = fft.compute_magnitude(&vec![1.0; 100]);

        let expected = ((PI * 10.0 * 100.0 / 1024.0).sin() / (PI * 10.0 / 1024.0).sin()).abs();
        assert!(expected > 2.0);
        assert!((spectrum[10] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_fft_sine_wave() {
        let mut fft = FftEngine::new(1024);

        // Exactly on bin 64
        let signal: Vec<f64> = (0..1024)
            .map(|n| (2.0 * PI * 64.0 * n as f64 / 1024.0).sin())
            .collect();

        let spectrum = fft.compute_magnitude(&signal);

        let (peak_bin, &peak_mag) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();

        assert_eq!(peak_bin, 64);
        assert!((peak_mag - 512.0).abs() < 1e-6);
    }

    #[test]
    fn test_frequency_axis() {
        let fft = FftEngine::new(1024);
        let freqs = fft.frequency_axis_hz(44100.0);

        assert_eq!(freqs.len(), 513);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[512] - 22050.0).abs() < 1e-9);
    }

    #[test]
    fn test_long_signal_is_truncated() {
        let mut fft = FftEngine::new(64);
        assert_eq!(fft.compute_magnitude(&vec![0.5; 1000]).len(), 33);
    }
}
