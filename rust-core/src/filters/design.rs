//! FIR band-pass design using the windowing method

use super::windows::{generate_window, WindowType};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Design a band-pass FIR filter with a fixed number of taps
///
/// # Algorithm
/// 1. Ideal impulse response as the difference of two sincs
/// 2. Multiply by the window
/// 3. Scale so the response at the band centre is exactly 1
///
/// # Arguments
/// * `num_taps` - Filter length M
/// * `wc1`, `wc2` - Cutoff frequencies (normalized, units of π rad/sample)
/// * `window_type` - Window applied to the ideal response
///
/// # Returns
/// Symmetric coefficients h[n] for n = 0..M-1
pub fn design_bandpass(num_taps: usize, wc1: f64, wc2: f64, window_type: WindowType) -> Vec<f64> {
    let window = generate_window(window_type, num_taps);
    let center = num_taps.saturating_sub(1) as f64 / 2.0;

    let wc1_rad = wc1 * PI;
    let wc2_rad = wc2 * PI;

    let mut h: Vec<f64> = (0..num_taps)
        .map(|n| {
            let n_shifted = n as f64 - center;

            // h_ideal[n] = (sin(wc2*n) - sin(wc1*n)) / (π*n), limit at n = 0
            let h_ideal = if n_shifted.abs() < 1e-10 {
                (wc2_rad - wc1_rad) / PI
            } else {
                ((wc2_rad * n_shifted).sin() - (wc1_rad * n_shifted).sin()) / (PI * n_shifted)
            };

            h_ideal * window[n]
        })
        .collect();

    // Zero-phase amplitude at the band centre
    let scale_freq = (wc1 + wc2) / 2.0 * PI;
    let amplitude: f64 = h
        .iter()
        .enumerate()
        .map(|(n, &h_n)| h_n * (scale_freq * (n as f64 - center)).cos())
        .sum();

    if amplitude.abs() > 1e-12 {
        for coeff in h.iter_mut() {
            *coeff /= amplitude;
        }
    }

    h
}

/// Calculate frequency response at given frequencies
///
/// # Arguments
/// * `h` - Filter coefficients
/// * `frequencies` - Normalized frequencies (units of π rad/sample)
///
/// # Returns
/// Complex frequency response H(e^jω)
pub fn frequency_response(h: &[f64], frequencies: &[f64]) -> Vec<Complex64> {
    frequencies
        .iter()
        .map(|&omega| {
            let omega_rad = omega * PI;
            h.iter()
                .enumerate()
                .map(|(n, &h_n)| h_n * Complex64::from_polar(1.0, -omega_rad * n as f64))
                .sum()
        })
        .collect()
}

/// Calculate magnitude response in dB
pub fn magnitude_response_db(h: &[f64], frequencies: &[f64]) -> Vec<f64> {
    frequency_response(h, frequencies)
        .iter()
        .map(|c| 20.0 * c.norm().max(1e-12).log10())
        .collect()
}

/// Unwrap a phase sequence by removing 2π jumps
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(phase.len());
    let mut offset = 0.0;

    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let delta = p - phase[i - 1];
            if delta > PI {
                offset -= 2.0 * PI;
            } else if delta < -PI {
                offset += 2.0 * PI;
            }
        }
        unwrapped.push(p + offset);
    }

    unwrapped
}
