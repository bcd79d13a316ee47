//! Windowing before the FFT to reduce spectral leakage

use crate::filters::windows::{WindowType, generate_window};

/// Apply window in-place
pub fn apply_window_inplace(signal: &mut [f64], window_type: WindowType) {
    if window_type == WindowType::Rectangular {
        return;
    }

    let window = generate_window(window_type, signal.len());
    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}

/// Calculate window correction factor
///
/// When applying windows, the signal amplitude is reduced. This factor
/// can be used to correct the FFT magnitude.
///
/// # Returns
/// Correction factor (multiply FFT magnitude by this)
pub fn window_correction_factor(window_type: WindowType, length: usize) -> f64 {
    let window = generate_window(window_type, length);
    let sum: f64 = window.iter().sum();
    if sum <= 0.0 {
        return 1.0;
    }
    length as f64 / sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_window() {
        let mut signal = vec![1.0; 100];
        apply_window_inplace(&mut signal, WindowType::Hamming);

        // Center should be close to 1.0
        assert!((signal[50] - 1.0).abs() < 0.01);

        // Edges should be reduced (Hamming ~0.08)
        assert!(signal[0] < 0.1);
        assert!(signal[99] < 0.1);
    }

    #[test]
    fn test_correction_factor() {
        let factor_rect = window_correction_factor(WindowType::Rectangular, 100);
        let factor_hamming = window_correction_factor(WindowType::Hamming, 100);

        assert!((factor_rect - 1.0).abs() < 0.01);
        assert!(factor_hamming > 1.5 && factor_hamming < 2.5);
    }
}
