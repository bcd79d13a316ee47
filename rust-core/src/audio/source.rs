//! Sample source for playback
//!
//! Holds a fully decoded mono buffer and a cursor into it. The cursor is an
//! atomic shared with the real-time reader so the control thread can seek
//! while the audio callback is pulling chunks.

use crate::error::{EqError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Decoded mono PCM, immutable after construction
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<[f64]>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap mono samples (normalized to [-1, 1]) at `sample_rate` Hz
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EqError::InvalidConfig("sample rate must be positive".into()));
        }
        Ok(Self {
            samples: samples.into(),
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Result of pulling one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk {
    /// Chunk filled; the value is the number of real (pre-padding) samples
    Samples(usize),

    /// Cursor reached the end of the buffer
    EndOfStream,
}

/// Real-time side of a loaded source: pulls chunks without locking or allocating
#[derive(Clone)]
pub struct StreamReader {
    buffer: AudioBuffer,
    cursor: Arc<AtomicUsize>,
}

impl StreamReader {
    /// Fill `out` with the next samples, zero-padding past the end
    pub fn fill_next(&self, out: &mut [f64]) -> Chunk {
        self.fill_next_tracked(out).0
    }

    /// Like [`fill_next`](Self::fill_next), also returning the cursor this
    /// read moved to, or `None` if a concurrent seek replaced it
    pub(crate) fn fill_next_tracked(&self, out: &mut [f64]) -> (Chunk, Option<usize>) {
        let samples = self.buffer.samples();
        let start = self.cursor.load(Ordering::Acquire);

        if start >= samples.len() {
            return (Chunk::EndOfStream, None);
        }

        let end = (start + out.len()).min(samples.len());
        let count = end - start;
        out[..count].copy_from_slice(&samples[start..end]);
        out[count..].fill(0.0);

        // A seek issued meanwhile takes precedence over the advance
        let advanced = self
            .cursor
            .compare_exchange(start, end, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        (Chunk::Samples(count), advanced.then_some(end))
    }

    /// Whether both readers share one loaded buffer and cursor
    pub fn same_source(&self, other: &StreamReader) -> bool {
        Arc::ptr_eq(&self.cursor, &other.cursor)
    }

    /// Move the cursor back to the start
    pub fn rewind(&self) {
        self.cursor.store(0, Ordering::Release);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }
}

/// Control side of the source: load, seek, position
pub struct StreamSource {
    reader: Option<StreamReader>,
}

impl StreamSource {
    /// Create an idle source (nothing loaded)
    pub fn new() -> Self {
        Self { reader: None }
    }

    /// Load a buffer and reset the cursor to 0
    ///
    /// Readers handed out before the load keep the previous buffer.
    pub fn load(&mut self, buffer: AudioBuffer) {
        self.reader = Some(StreamReader {
            buffer,
            cursor: Arc::new(AtomicUsize::new(0)),
        });
    }

    pub fn is_loaded(&self) -> bool {
        self.reader.is_some()
    }

    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.reader.as_ref().map(|r| &r.buffer)
    }

    /// Reader sharing this source's buffer and cursor
    pub fn reader(&self) -> Option<StreamReader> {
        self.reader.clone()
    }

    /// Next chunk of exactly `size` samples, or `None` at end of stream
    pub fn next_chunk(&self, size: usize) -> Option<Vec<f64>> {
        let reader = self.reader.as_ref()?;
        let mut chunk = vec![0.0; size];
        match reader.fill_next(&mut chunk) {
            Chunk::Samples(_) => Some(chunk),
            Chunk::EndOfStream => None,
        }
    }

    /// Seek to `seconds`, clamped to the buffer; no-op when idle
    pub fn seek(&self, seconds: f64) {
        if let Some(reader) = &self.reader {
            let len = reader.buffer.len();
            let target = if seconds > 0.0 {
                // Saturating cast handles +inf and huge values
                ((seconds * reader.buffer.sample_rate() as f64).round() as usize).min(len)
            } else {
                0
            };
            reader.cursor.store(target, Ordering::Release);
        }
    }

    /// Move the cursor back to the start
    pub fn rewind(&self) {
        if let Some(reader) = &self.reader {
            reader.rewind();
        }
    }

    /// Cursor in samples (0 when idle)
    pub fn cursor(&self) -> usize {
        self.reader.as_ref().map_or(0, StreamReader::cursor)
    }

    /// Cursor in seconds
    pub fn position_secs(&self) -> f64 {
        self.reader
            .as_ref()
            .map_or(0.0, |r| r.cursor() as f64 / r.buffer.sample_rate() as f64)
    }

    /// Loaded duration in seconds (0 when idle)
    pub fn duration_secs(&self) -> f64 {
        self.buffer().map_or(0.0, AudioBuffer::duration_secs)
    }

    /// Loaded length in samples (0 when idle)
    pub fn len(&self) -> usize {
        self.buffer().map_or(0, AudioBuffer::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StreamSource {
    fn default() -> Self {
        Self::new()
    }
}
