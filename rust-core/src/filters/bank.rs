//! Three-band filter bank
//!
//! Designs one band-pass FIR per band from sample rate, tap count and band
//! edges in Hz. Immutable once built; shared by every block processor.

use super::design::{design_bandpass, frequency_response, magnitude_response_db};
use super::windows::WindowType;
use crate::config::{EqualizerConfig, NUM_BANDS};
use crate::error::{EqError, Result};
use num_complex::Complex64;

/// Window used for every band
const DESIGN_WINDOW: WindowType = WindowType::Hamming;

/// Equalizer band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low = 0,
    Mid = 1,
    High = 2,
}

impl Band {
    pub const ALL: [Band; NUM_BANDS] = [Band::Low, Band::Mid, Band::High];

    /// Band for an index in 0..3
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Mid => "mid",
            Band::High => "high",
        }
    }
}

/// Per-band FIR coefficients
#[derive(Debug, Clone)]
pub struct FilterBank {
    coefficients: [Vec<f64>; NUM_BANDS],
    band_edges: [[f64; 2]; NUM_BANDS],
    sample_rate: u32,
}

impl FilterBank {
    /// Design the bank
    ///
    /// Fails with `InvalidConfig` if the sample rate is zero, `num_taps` < 1,
    /// or any band's edges are not strictly increasing inside (0, Nyquist).
    pub fn build(sample_rate: u32, num_taps: usize, band_edges: [[f64; 2]; NUM_BANDS]) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EqError::InvalidConfig("sample rate must be positive".into()));
        }
        if num_taps < 1 {
            return Err(EqError::InvalidConfig("tap count must be at least 1".into()));
        }

        let nyquist = sample_rate as f64 / 2.0;

        for (band, &[low, high]) in Band::ALL.iter().zip(band_edges.iter()) {
            let in_range = |f: f64| f.is_finite() && f > 0.0 && f < nyquist;
            if !(in_range(low) && in_range(high) && low < high) {
                return Err(EqError::InvalidConfig(format!(
                    "{} band edges [{}, {}] Hz must be increasing within (0, {}) Hz",
                    band.name(),
                    low,
                    high,
                    nyquist
                )));
            }
        }

        let coefficients = band_edges.map(|[low, high]| {
            design_bandpass(num_taps, low / nyquist, high / nyquist, DESIGN_WINDOW)
        });

        log::debug!(
            "Designed {}-tap filter bank at {} Hz: {:?}",
            num_taps,
            sample_rate,
            band_edges
        );

        Ok(Self {
            coefficients,
            band_edges,
            sample_rate,
        })
    }

    /// Build from an engine configuration
    pub fn from_config(config: &EqualizerConfig) -> Result<Self> {
        Self::build(config.sample_rate, config.num_taps, config.band_edges)
    }

    /// Coefficients of one band
    pub fn coefficients(&self, band: Band) -> &[f64] {
        &self.coefficients[band.index()]
    }

    /// Band edges in Hz
    pub fn band_edges(&self, band: Band) -> [f64; 2] {
        self.band_edges[band.index()]
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_taps(&self) -> usize {
        self.coefficients[0].len()
    }

    /// Group delay shared by all bands, in samples
    pub fn group_delay_samples(&self) -> f64 {
        (self.num_taps() - 1) as f64 / 2.0
    }

    /// Approximate width of each band edge's transition region in Hz
    pub fn transition_width_hz(&self) -> f64 {
        DESIGN_WINDOW.transition_width(self.num_taps()) * self.sample_rate as f64 / 2.0
    }

    /// Complex response of one band at frequencies in Hz
    pub fn response(&self, band: Band, frequencies_hz: &[f64]) -> Vec<Complex64> {
        frequency_response(self.coefficients(band), &self.normalize(frequencies_hz))
    }

    /// Magnitude response of one band in dB at frequencies in Hz
    pub fn response_db(&self, band: Band, frequencies_hz: &[f64]) -> Vec<f64> {
        magnitude_response_db(self.coefficients(band), &self.normalize(frequencies_hz))
    }

    fn normalize(&self, frequencies_hz: &[f64]) -> Vec<f64> {
        let nyquist = self.sample_rate as f64 / 2.0;
        frequencies_hz.iter().map(|f| f / nyquist).collect()
    }
}
