//! Spectrum of monitor frames
//!
//! Turns one processed block into a dB magnitude spectrum for display.

use super::fft::FftEngine;
use super::windowing::{apply_window_inplace, window_correction_factor};
use crate::filters::windows::WindowType;

/// Floor added to magnitudes before taking the log
const MAGNITUDE_FLOOR: f64 = 1e-10;

/// Spectrum analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFT size (frames are zero-padded or truncated to this)
    pub fft_size: usize,

    /// Window applied before the FFT
    pub window_type: WindowType,

    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Scale magnitudes to undo the window's amplitude loss
    pub apply_correction: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            window_type: WindowType::Rectangular,
            sample_rate: 44100.0,
            apply_correction: false,
        }
    }
}

/// Magnitude spectrum of one frame
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Bin centre frequencies in Hz
    pub frequencies_hz: Vec<f64>,

    /// 20·log10(|X| + 1e-10) per bin
    pub magnitude_db: Vec<f64>,
}

impl Spectrum {
    /// Frequency of the strongest non-DC bin, if any
    pub fn dominant_frequency(&self) -> Option<f64> {
        self.magnitude_db
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(bin, _)| self.frequencies_hz[bin])
    }
}

/// Spectrum analyzer for monitor frames
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    fft_engine: FftEngine,
    frame: Vec<f64>,
    correction_factor: f64,
}

impl SpectrumAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let fft_engine = FftEngine::new(config.fft_size);
        let correction_factor = if config.apply_correction {
            window_correction_factor(config.window_type, fft_engine.fft_size())
        } else {
            1.0
        };

        Self {
            frame: vec![0.0; fft_engine.fft_size()],
            config,
            fft_engine,
            correction_factor,
        }
    }

    /// Analyzer for frames at `sample_rate`, FFT size equal to the frame length
    pub fn for_frames(frame_size: usize, sample_rate: u32) -> Self {
        Self::new(AnalyzerConfig {
            fft_size: frame_size,
            sample_rate: sample_rate as f64,
            ..Default::default()
        })
    }

    /// Magnitude spectrum |X[k]| of `signal`
    pub fn analyze(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len().min(self.frame.len());
        self.frame[..n].copy_from_slice(&signal[..n]);
        self.frame[n..].fill(0.0);
        apply_window_inplace(&mut self.frame, self.config.window_type);

        let mut spectrum = self.fft_engine.compute_magnitude(&self.frame);
        if self.correction_factor != 1.0 {
            for s in spectrum.iter_mut() {
                *s *= self.correction_factor;
            }
        }
        spectrum
    }

    /// Magnitude spectrum in dB: 20·log10(|X| + 1e-10)
    pub fn analyze_db(&mut self, signal: &[f64]) -> Vec<f64> {
        self.analyze(signal)
            .into_iter()
            .map(|mag| 20.0 * (mag + MAGNITUDE_FLOOR).log10())
            .collect()
    }

    /// dB spectrum paired with its frequency axis
    pub fn spectrum(&mut self, signal: &[f64]) -> Spectrum {
        Spectrum {
            magnitude_db: self.analyze_db(signal),
            frequencies_hz: self.frequency_bins_hz(),
        }
    }

    /// Get frequency bins in Hz
    pub fn frequency_bins_hz(&self) -> Vec<f64> {
        self.fft_engine.frequency_axis_hz(self.config.sample_rate)
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Get number of frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_engine.num_bins()
    }
}
