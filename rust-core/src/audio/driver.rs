//! Playback driver
//!
//! Owns the output stream and the real-time renderer. The renderer pulls
//! fixed-size chunks from the source, runs them through the block processor,
//! publishes each processed block to the monitor queue and copies it into
//! whatever period size the device asks for.

use super::monitor::{monitor_queue, MonitorConsumer, MonitorProducer};
use super::output::{OutputSink, OutputStream, StreamSettings};
use super::processor::BlockProcessor;
use super::source::{Chunk, StreamReader, StreamSource};
use super::gain::GainStage;
use crate::config::EqualizerConfig;
use crate::error::{EqError, Result};
use crate::filters::FilterBank;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Packed playback progress meaning "nothing held back"
const NO_PROGRESS: u64 = u64::MAX;

/// Pack (cursor after the last pulled block, samples of it not yet output)
fn pack_progress(block_end: usize, unplayed: usize) -> u64 {
    match (u32::try_from(block_end), u32::try_from(unplayed)) {
        (Ok(end), Ok(unplayed)) => (u64::from(end) << 32) | u64::from(unplayed),
        _ => NO_PROGRESS,
    }
}

/// Real-time half of the driver, run from the output callback
pub struct Renderer {
    processor: BlockProcessor,
    reader: Option<StreamReader>,

    /// Next chunk from the source
    input: Vec<f64>,

    /// Last processed block, partially played
    processed: Vec<f64>,

    /// Read position in `processed`
    pending: usize,

    /// Source cursor right after `processed` was pulled; `None` once the
    /// block no longer follows on from the cursor
    block_end: Option<usize>,

    monitor: MonitorProducer,
    playing: Arc<AtomicBool>,
    progress: Arc<AtomicU64>,
    ended: SyncSender<()>,
}

impl Renderer {
    fn new(
        processor: BlockProcessor,
        block_size: usize,
        monitor: MonitorProducer,
        playing: Arc<AtomicBool>,
        progress: Arc<AtomicU64>,
        ended: SyncSender<()>,
    ) -> Self {
        Self {
            processor,
            reader: None,
            input: vec![0.0; block_size],
            processed: vec![0.0; block_size],
            pending: block_size,
            block_end: None,
            monitor,
            playing,
            progress,
            ended,
        }
    }

    /// Attach a reader before playback starts
    ///
    /// Resuming the same source at the cursor where the last block ended
    /// keeps the unplayed rest of that block and the filter history.
    /// Anything else (new source, seek, rewind) starts clean.
    ///
    /// # Returns
    /// `true` if playback resumes where it left off
    fn prepare(&mut self, reader: StreamReader) -> bool {
        let resumes = self.block_end.is_some_and(|end| end == reader.cursor())
            && self
                .reader
                .as_ref()
                .is_some_and(|current| current.same_source(&reader));

        if !resumes {
            self.clear();
        }
        self.reader = Some(reader);
        resumes
    }

    /// Drop the reader and everything carried over from it
    fn detach(&mut self) {
        self.reader = None;
        self.clear();
    }

    fn clear(&mut self) {
        self.processor.reset();
        self.pending = self.processed.len();
        self.block_end = None;
        self.publish_progress();
    }

    /// Fill an interleaved output buffer; mono is copied to every channel
    ///
    /// Frames after the end of the stream are silent.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);

        for frame in out.chunks_mut(channels) {
            if self.pending >= self.processed.len() && !self.pull_block() {
                frame.fill(0.0);
                continue;
            }

            let sample = self.processed[self.pending] as f32;
            self.pending += 1;
            frame.fill(sample);
        }

        self.publish_progress();
    }

    /// Process the next chunk into `processed`
    ///
    /// # Returns
    /// `false` when stopped or at end of stream
    fn pull_block(&mut self) -> bool {
        if !self.playing.load(Ordering::SeqCst) {
            return false;
        }

        let Some(reader) = &self.reader else {
            return false;
        };

        match reader.fill_next_tracked(&mut self.input) {
            (Chunk::Samples(_), block_end) => {
                self.processor.process(&self.input, &mut self.processed);
                self.monitor.try_push(&self.processed);
                self.pending = 0;
                self.block_end = block_end;
                true
            }
            (Chunk::EndOfStream, _) => {
                reader.rewind();
                self.block_end = None;
                self.playing.store(false, Ordering::SeqCst);
                // Bounded and non-blocking; a full slot already says the same
                let _ = self.ended.try_send(());
                false
            }
        }
    }

    fn publish_progress(&self) {
        let packed = match self.block_end {
            Some(end) => pack_progress(end, self.processed.len() - self.pending),
            None => NO_PROGRESS,
        };
        self.progress.store(packed, Ordering::Release);
    }
}

/// Drives playback of a [`StreamSource`] through an [`OutputSink`]
///
/// At end of stream the renderer stops itself and outputs silence. The
/// device is released the next time the control side looks at the driver:
/// [`state`](Self::state), [`wait_for_end`](Self::wait_for_end),
/// [`stop`](Self::stop) or drop.
pub struct PlaybackDriver {
    sink: Box<dyn OutputSink>,
    settings: StreamSettings,
    renderer: Arc<Mutex<Renderer>>,
    playing: Arc<AtomicBool>,
    progress: Arc<AtomicU64>,
    ended: Receiver<()>,
    stream: Option<Box<dyn OutputStream>>,
}

impl PlaybackDriver {
    /// Create a stopped driver and the consumer end of its monitor queue
    pub fn new(
        sink: Box<dyn OutputSink>,
        bank: &FilterBank,
        gains: GainStage,
        config: &EqualizerConfig,
    ) -> (Self, MonitorConsumer) {
        let (producer, consumer) = monitor_queue(config.monitor_capacity, config.block_size);
        let playing = Arc::new(AtomicBool::new(false));
        let progress = Arc::new(AtomicU64::new(NO_PROGRESS));
        let (ended_tx, ended_rx) = mpsc::sync_channel(1);

        let processor = BlockProcessor::new(bank, gains, config.block_size);
        let renderer = Renderer::new(
            processor,
            config.block_size,
            producer,
            Arc::clone(&playing),
            Arc::clone(&progress),
            ended_tx,
        );

        let driver = Self {
            sink,
            settings: StreamSettings {
                sample_rate: config.sample_rate,
                block_size: config.block_size,
            },
            renderer: Arc::new(Mutex::new(renderer)),
            playing,
            progress,
            ended: ended_rx,
            stream: None,
        };

        (driver, consumer)
    }

    /// Start playing `source` from its current cursor
    ///
    /// Does nothing if already playing. After a pause with no seek in
    /// between, playback picks up at the exact sample where it stopped;
    /// otherwise filter history is cleared first.
    pub fn start(&mut self, source: &StreamSource) -> Result<()> {
        if self.state() == PlaybackState::Playing {
            return Ok(());
        }

        let reader = source.reader().ok_or(EqError::NoAudioLoaded)?;

        let resumed = self
            .renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prepare(reader);

        while self.ended.try_recv().is_ok() {}
        self.playing.store(true, Ordering::SeqCst);

        let renderer = Arc::clone(&self.renderer);
        let callback = Box::new(move |out: &mut [f32], channels: usize| {
            // Never block the audio thread; a busy control side costs one silent period
            match renderer.try_lock() {
                Ok(mut renderer) => renderer.render(out, channels),
                Err(_) => out.fill(0.0),
            }
        });

        match self.sink.open(&self.settings, callback) {
            Ok(stream) => {
                log::info!(
                    "Playback {} on '{}'",
                    if resumed { "resumed" } else { "started" },
                    stream.device_name()
                );
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                self.playing.store(false, Ordering::SeqCst);
                log::error!("Failed to start playback: {}", e);
                Err(e)
            }
        }
    }

    /// Stop playback and release the device; no-op when already stopped
    ///
    /// Returns once the stream is closed, so no further callbacks run.
    pub fn stop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::warn!("Failed to pause output stream: {}", e);
            }
            drop(stream);
            log::info!("Playback stopped");
        }
    }

    /// Stop and forget the current source, e.g. before loading another one
    pub fn detach(&mut self) {
        self.stop();
        self.renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .detach();
    }

    /// Current state; releases the device if the stream ran out
    pub fn state(&mut self) -> PlaybackState {
        if self.playing.load(Ordering::SeqCst) {
            return PlaybackState::Playing;
        }

        if self.stream.take().is_some() {
            log::info!("Playback reached end of stream");
        }
        PlaybackState::Stopped
    }

    /// Wait up to `timeout` for playback to reach the end of the stream
    ///
    /// Returns as soon as the renderer signals the end, releasing the
    /// device, or after `timeout` with the state at that point.
    pub fn wait_for_end(&mut self, timeout: Duration) -> PlaybackState {
        if self.is_playing() {
            let _ = self.ended.recv_timeout(timeout);
        }
        self.state()
    }

    /// Whether the renderer is still producing audio
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Index of the next sample the listener will hear from `source`
    ///
    /// The source cursor runs up to one block ahead of the output; this
    /// subtracts whatever of the last block has not been played yet.
    pub fn heard_cursor(&self, source: &StreamSource) -> usize {
        let cursor = source.cursor();
        let packed = self.progress.load(Ordering::Acquire);
        if packed == NO_PROGRESS {
            return cursor;
        }

        let block_end = (packed >> 32) as usize;
        let unplayed = (packed & u64::from(u32::MAX)) as usize;
        if block_end == cursor {
            cursor - unplayed.min(cursor)
        } else {
            cursor
        }
    }

    /// Blocks replaced by silence because processing produced non-finite output
    pub fn faults(&self) -> u64 {
        self.renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .processor
            .faults()
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
