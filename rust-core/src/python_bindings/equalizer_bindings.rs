//! Python bindings for the equalizer engine

use numpy::PyArray1;
use pyo3::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{Equalizer, PlaybackState};
use crate::config::EqualizerConfig;
use crate::spectrum::SpectrumAnalyzer;

/// Three-band equalizer exposed to Python
///
/// Playback runs on the audio thread; every method except `wait` returns
/// immediately. The output device stays open after the track ends until
/// `is_playing`, `wait` or a transport method is called.
#[pyclass(name = "Equalizer", unsendable)]
pub struct PyEqualizer {
    engine: Equalizer,
    analyzer: SpectrumAnalyzer,
}

#[pymethods]
impl PyEqualizer {
    /// Create an equalizer on the default output device
    ///
    /// Args:
    ///     sample_rate: Engine sample rate in Hz
    ///     block_size: Samples per processed block
    ///     num_taps: FIR length per band
    ///     config_path: Optional JSON preset; other arguments are ignored if given
    #[new]
    #[pyo3(signature = (sample_rate=44100, block_size=1024, num_taps=101, config_path=None))]
    fn new(sample_rate: u32, block_size: usize, num_taps: usize, config_path: Option<PathBuf>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => EqualizerConfig::from_json_file(&path)?,
            None => EqualizerConfig {
                sample_rate,
                block_size,
                num_taps,
                ..Default::default()
            },
        };

        let analyzer = SpectrumAnalyzer::for_frames(config.block_size, config.sample_rate);
        let engine = Equalizer::new(config)?;

        Ok(Self { engine, analyzer })
    }

    /// Decode an audio file and make it the current track (stops playback)
    fn load(&mut self, path: PathBuf) -> PyResult<()> {
        Ok(self.engine.load_file(&path)?)
    }

    fn play(&mut self) -> PyResult<()> {
        Ok(self.engine.play()?)
    }

    fn pause(&mut self) {
        self.engine.pause();
    }

    /// Stop and return to the start
    fn stop(&mut self) {
        self.engine.stop();
    }

    fn seek(&self, seconds: f64) {
        self.engine.seek(seconds);
    }

    /// Set band gain in dB (band 0 = low, 1 = mid, 2 = high)
    fn set_gain(&self, band: usize, db: f64) -> PyResult<()> {
        Ok(self.engine.set_gain_db(band, db)?)
    }

    fn gains_db(&self) -> Vec<f64> {
        self.engine.gains_db().to_vec()
    }

    fn reset_gains(&self) {
        self.engine.reset_gains();
    }

    fn position(&self) -> f64 {
        self.engine.position_secs()
    }

    fn duration(&self) -> f64 {
        self.engine.duration_secs()
    }

    fn is_playing(&mut self) -> bool {
        self.engine.is_playing()
    }

    /// Wait for the track to finish playing
    ///
    /// Args:
    ///     timeout: Longest wait in seconds
    ///
    /// Returns:
    ///     True if playback has stopped (the device is then closed)
    #[pyo3(signature = (timeout=1.0))]
    fn wait(&mut self, timeout: f64) -> bool {
        let timeout = Duration::try_from_secs_f64(timeout.max(0.0)).unwrap_or(Duration::MAX);
        self.engine.wait_for_end(timeout) == PlaybackState::Stopped
    }

    fn file_name(&self) -> Option<String> {
        self.engine.file_name().map(str::to_owned)
    }

    /// Render the whole track with the current gains
    fn process_full<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray1<f64>> {
        let output = self.engine.process_full()?;
        Ok(PyArray1::from_vec(py, output))
    }

    /// Render the whole track to a 16-bit WAV file
    fn save_processed(&self, path: PathBuf) -> PyResult<()> {
        Ok(self.engine.save_processed(&path)?)
    }

    /// Newest processed block, or None if nothing new was played
    fn latest_block<'py>(&mut self, py: Python<'py>) -> Option<&'py PyArray1<f64>> {
        self.engine
            .latest_block()
            .map(|block| PyArray1::from_vec(py, block))
    }

    /// Spectrum of the newest processed block
    ///
    /// Returns:
    ///     Tuple of (frequencies_hz, magnitude_db) or None if nothing new
    fn latest_spectrum<'py>(
        &mut self,
        py: Python<'py>,
    ) -> Option<(&'py PyArray1<f64>, &'py PyArray1<f64>)> {
        let block = self.engine.latest_block()?;
        let spectrum = self.analyzer.spectrum(&block);
        Some((
            PyArray1::from_vec(py, spectrum.frequencies_hz),
            PyArray1::from_vec(py, spectrum.magnitude_db),
        ))
    }
}
