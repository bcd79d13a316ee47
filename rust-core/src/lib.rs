//! Band Equalizer - three-band streaming FIR equalizer core
//!
//! Linear-phase band-pass filter bank, per-band gains adjustable while
//! playing, block processing with continuous filter state, and real-time
//! playback with a lock-free monitor queue. Python bindings are available
//! behind the `python` feature.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![cfg_attr(feature = "python", allow(non_local_definitions))]

pub mod audio;
pub mod config;
pub mod error;
pub mod filters;
pub mod spectrum;

#[cfg(feature = "python")]
pub mod python_bindings;

pub use audio::{AudioBuffer, BlockProcessor, Equalizer, GainStage, PlaybackState, StreamSource};
pub use config::{EqualizerConfig, NUM_BANDS};
pub use error::{EqError, Result};
pub use filters::{Band, FilterBank, WindowType};
pub use spectrum::SpectrumAnalyzer;
