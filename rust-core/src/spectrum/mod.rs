//! Spectral analysis of monitor frames

pub mod fft;
pub mod windowing;
pub mod analysis;

pub use fft::FftEngine;
pub use analysis::{AnalyzerConfig, Spectrum, SpectrumAnalyzer};
