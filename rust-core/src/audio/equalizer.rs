//! Equalizer engine
//!
//! Ties the filter bank, gains, source and playback driver together behind
//! the operations a front end needs: load, adjust, play, seek, export.

use super::codec;
use super::driver::{PlaybackDriver, PlaybackState};
use super::gain::GainStage;
use super::monitor::MonitorConsumer;
use super::output::{CpalSink, OutputSink};
use super::processor::BlockProcessor;
use super::source::{AudioBuffer, StreamSource};
use crate::config::{EqualizerConfig, NUM_BANDS};
use crate::error::{EqError, Result};
use crate::filters::{Band, FilterBank};
use std::path::Path;
use std::time::Duration;

/// Three-band equalizer with file playback
///
/// When playback runs off the end of the track the audio thread stops and
/// rewinds on its own, but the output device is only closed once the
/// control side notices: through [`state`](Self::state),
/// [`is_playing`](Self::is_playing), [`wait_for_end`](Self::wait_for_end),
/// any transport call or drop. A front end should either poll one of these
/// or park a thread in `wait_for_end`.
pub struct Equalizer {
    config: EqualizerConfig,
    bank: FilterBank,
    gains: GainStage,
    source: StreamSource,
    driver: PlaybackDriver,
    monitor: Option<MonitorConsumer>,
    file_name: Option<String>,
}

impl Equalizer {
    /// Create an engine playing through the default output device
    pub fn new(config: EqualizerConfig) -> Result<Self> {
        Self::with_sink(config, Box::new(CpalSink::new()))
    }

    /// Create an engine playing through `sink`
    pub fn with_sink(config: EqualizerConfig, sink: Box<dyn OutputSink>) -> Result<Self> {
        config.validate()?;

        let bank = FilterBank::from_config(&config)?;
        let gains = GainStage::from_config(&config);
        let (driver, monitor) = PlaybackDriver::new(sink, &bank, gains.clone(), &config);

        log::info!(
            "Equalizer ready: {} Hz, {} taps, block {}",
            config.sample_rate,
            config.num_taps,
            config.block_size
        );

        Ok(Self {
            config,
            bank,
            gains,
            source: StreamSource::new(),
            driver,
            monitor: Some(monitor),
            file_name: None,
        })
    }

    /// Decode `path` and make it the current source
    ///
    /// Stops playback first. Audio at another rate is resampled to the
    /// engine rate.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let buffer = codec::decode(path)?;
        self.load_buffer(buffer)?;
        self.file_name = path.file_name().map(|name| name.to_string_lossy().into_owned());

        log::info!(
            "Loaded {} ({:.2} s)",
            path.display(),
            self.duration_secs()
        );
        Ok(())
    }

    /// Make `buffer` the current source, resampling if needed
    pub fn load_buffer(&mut self, buffer: AudioBuffer) -> Result<()> {
        let buffer = if buffer.sample_rate() != self.config.sample_rate {
            codec::resample(&buffer, self.config.sample_rate)?
        } else {
            buffer
        };

        self.driver.detach();
        self.source.load(buffer);
        self.file_name = None;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.source.is_loaded()
    }

    /// Set the gain of band `band_index` (0 = low, 1 = mid, 2 = high) in dB
    pub fn set_gain_db(&self, band_index: usize, db: f64) -> Result<()> {
        self.gains.set_gain_db(band_index, db)?;
        log::debug!("Band {} gain set to {:.1} dB", band_index, db);
        Ok(())
    }

    /// Current gains in dB
    pub fn gains_db(&self) -> [f64; NUM_BANDS] {
        self.gains.gains_db()
    }

    /// Current linear gains
    pub fn gains(&self) -> [f64; NUM_BANDS] {
        self.gains.gains()
    }

    /// Return every band to 0 dB
    pub fn reset_gains(&self) {
        self.gains.reset();
    }

    /// Handle for adjusting gains from another thread
    pub fn gain_stage(&self) -> GainStage {
        self.gains.clone()
    }

    /// Start playback from the current position
    ///
    /// After [`pause`](Self::pause) this continues with the very next sample.
    pub fn play(&mut self) -> Result<()> {
        self.driver.start(&self.source)
    }

    /// Stop playback, keeping the position
    pub fn pause(&mut self) {
        self.driver.stop();
    }

    /// Stop playback and return to the start
    pub fn stop(&mut self) {
        self.driver.stop();
        self.source.rewind();
    }

    /// Seek to `seconds`, clamped to the loaded audio
    pub fn seek(&self, seconds: f64) {
        self.source.seek(seconds);
    }

    /// Position of the next sample to be heard
    pub fn position_secs(&self) -> f64 {
        self.source.buffer().map_or(0.0, |buffer| {
            self.driver.heard_cursor(&self.source) as f64 / buffer.sample_rate() as f64
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.source.duration_secs()
    }

    /// Transport state; releases the device once playback ran to the end
    pub fn state(&mut self) -> PlaybackState {
        self.driver.state()
    }

    pub fn is_playing(&mut self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Block until playback reaches the end of the track, at most `timeout`
    ///
    /// Releases the device when the end was reached.
    pub fn wait_for_end(&mut self, timeout: Duration) -> PlaybackState {
        self.driver.wait_for_end(timeout)
    }

    /// File name of the loaded audio, if it came from a file
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Run the whole loaded buffer through a fresh processor
    ///
    /// Uses the same block size and gains as playback; the output has the
    /// length of the input.
    pub fn process_full(&self) -> Result<Vec<f64>> {
        let buffer = self.source.buffer().ok_or(EqError::NoAudioLoaded)?;
        let block_size = self.config.block_size;

        let mut processor = BlockProcessor::new(&self.bank, self.gains.clone(), block_size);
        let mut output = Vec::with_capacity(buffer.len() + block_size);
        let mut block = vec![0.0; block_size];
        let mut processed = vec![0.0; block_size];

        for chunk in buffer.samples().chunks(block_size) {
            block[..chunk.len()].copy_from_slice(chunk);
            block[chunk.len()..].fill(0.0);
            processor.process(&block, &mut processed);
            output.extend_from_slice(&processed);
        }

        output.truncate(buffer.len());
        Ok(output)
    }

    /// Render the loaded audio with the current gains to a 16-bit WAV file
    pub fn save_processed(&self, path: &Path) -> Result<()> {
        let output = self.process_full()?;
        codec::encode(path, &output, self.config.sample_rate)?;
        log::info!("Saved processed audio to {}", path.display());
        Ok(())
    }

    /// Take the monitor queue consumer, e.g. to drain it on a UI thread
    pub fn take_monitor(&mut self) -> Option<MonitorConsumer> {
        self.monitor.take()
    }

    /// Newest processed block, discarding older ones
    ///
    /// `None` if nothing new arrived or the consumer was taken.
    pub fn latest_block(&mut self) -> Option<Vec<f64>> {
        self.monitor.as_mut()?.pop_latest()
    }

    /// Magnitude response of one band's filter in dB
    pub fn band_response_db(&self, band: Band, frequencies_hz: &[f64]) -> Vec<f64> {
        self.bank.response_db(band, frequencies_hz)
    }

    pub fn filter_bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    /// Blocks replaced by silence during playback
    pub fn faults(&self) -> u64 {
        self.driver.faults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::ManualSink;

    fn engine(sink: &ManualSink) -> Equalizer {
        Equalizer::with_sink(EqualizerConfig::default(), Box::new(sink.clone())).unwrap()
    }

    fn noise(len: usize) -> Vec<f64> {
        let mut state: u32 = 12345;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                0.2 * (state as f64 / u32::MAX as f64 - 0.5)
            })
            .collect()
    }

    #[test]
    fn test_idle_engine() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);

        assert!(!eq.is_loaded());
        assert_eq!(eq.duration_secs(), 0.0);
        assert_eq!(eq.position_secs(), 0.0);
        assert!(matches!(eq.play(), Err(EqError::NoAudioLoaded)));
        assert!(matches!(eq.process_full(), Err(EqError::NoAudioLoaded)));
        assert!(!eq.is_playing());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EqualizerConfig {
            num_taps: 0,
            ..Default::default()
        };
        assert!(Equalizer::with_sink(config, Box::new(ManualSink::new(1))).is_err());
    }

    #[test]
    fn test_load_while_playing_stops() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);

        eq.load_buffer(AudioBuffer::new(noise(44100), 44100).unwrap()).unwrap();
        eq.play().unwrap();
        assert!(eq.is_playing());

        eq.load_buffer(AudioBuffer::new(noise(22050), 44100).unwrap()).unwrap();
        assert!(!eq.is_playing());
        assert!(!sink.is_open());
        assert!((eq.duration_secs() - 0.5).abs() < 1e-12);
        assert_eq!(eq.position_secs(), 0.0);
    }

    #[test]
    fn test_load_resamples_to_engine_rate() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);

        eq.load_buffer(AudioBuffer::new(noise(48000), 48000).unwrap()).unwrap();
        assert!((eq.duration_secs() - 1.0).abs() < 1e-3);
        assert_eq!(eq.process_full().unwrap().len(), 44100);
    }

    fn tone(len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| 0.5 * (2.0 * std::f64::consts::PI * 440.0 * n as f64 / 44100.0).sin())
            .collect()
    }

    #[test]
    fn test_pause_then_play_continues_seamlessly() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);
        eq.load_buffer(AudioBuffer::new(tone(44100), 44100).unwrap()).unwrap();
        let offline = eq.process_full().unwrap();

        eq.play().unwrap();
        let mut played = sink.pull(100).unwrap();
        eq.pause();
        assert!(!sink.is_open());
        assert!((eq.position_secs() - 100.0 / 44100.0).abs() < 1e-9);

        eq.play().unwrap();
        played.extend(sink.pull(2000).unwrap());
        assert!((eq.position_secs() - 2100.0 / 44100.0).abs() < 1e-9);

        for (i, (a, b)) in played.iter().zip(offline.iter()).enumerate() {
            assert!((*a as f64 - b).abs() < 1e-6, "Mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_stop_rewinds_and_restarts_from_top() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);
        eq.load_buffer(AudioBuffer::new(tone(44100), 44100).unwrap()).unwrap();
        let offline = eq.process_full().unwrap();

        eq.play().unwrap();
        sink.pull(1500).unwrap();
        eq.stop();
        assert_eq!(eq.position_secs(), 0.0);
        assert!(!eq.is_playing());

        eq.play().unwrap();
        let played = sink.pull(1500).unwrap();
        for (i, (a, b)) in played.iter().zip(offline.iter()).enumerate() {
            assert!((*a as f64 - b).abs() < 1e-6, "Mismatch at {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn test_wait_for_end_closes_device() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);
        eq.load_buffer(AudioBuffer::new(tone(3000), 44100).unwrap()).unwrap();

        eq.play().unwrap();
        sink.pull(4096).unwrap();
        assert!(sink.is_open());

        assert_eq!(eq.wait_for_end(Duration::from_secs(5)), PlaybackState::Stopped);
        assert!(!sink.is_open());
        assert_eq!(eq.position_secs(), 0.0);
    }

    #[test]
    fn test_gain_validation_and_reset() {
        let sink = ManualSink::new(1);
        let eq = engine(&sink);

        eq.set_gain_db(2, -12.0).unwrap();
        assert!(eq.set_gain_db(2, -20.0).is_err());
        assert!(eq.set_gain_db(5, 0.0).is_err());
        assert!((eq.gains_db()[2] + 12.0).abs() < 1e-9);

        eq.reset_gains();
        assert_eq!(eq.gains(), [1.0; 3]);
    }

    #[test]
    fn test_process_full_matches_block_processing() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);
        let input = noise(5000);
        eq.load_buffer(AudioBuffer::new(input.clone(), 44100).unwrap()).unwrap();

        let output = eq.process_full().unwrap();
        assert_eq!(output.len(), 5000);

        let mut processor = BlockProcessor::new(eq.filter_bank(), GainStage::default(), 1024);
        let mut padded = input;
        padded.resize(5120, 0.0);
        let expected: Vec<f64> = padded.chunks(1024).flat_map(|b| processor.process_block(b)).collect();

        for (a, b) in output.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_monitor_can_be_taken_once() {
        let sink = ManualSink::new(1);
        let mut eq = engine(&sink);
        eq.load_buffer(AudioBuffer::new(noise(44100), 44100).unwrap()).unwrap();

        eq.play().unwrap();
        sink.pull(3000).unwrap();
        assert_eq!(eq.latest_block().map(|b| b.len()), Some(1024));

        assert!(eq.take_monitor().is_some());
        assert!(eq.take_monitor().is_none());
        assert!(eq.latest_block().is_none());
    }
}
