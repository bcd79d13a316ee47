//! Per-band gain stage
//!
//! Linear gains stored as f64 bits in atomics: one control-side writer,
//! any number of readers (including the audio callback), no locks.

use crate::config::{EqualizerConfig, NUM_BANDS};
use crate::error::{EqError, Result};
use crate::filters::Band;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Convert dB to linear gain
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert linear gain to dB
#[inline]
pub fn linear_to_db(gain: f64) -> f64 {
    20.0 * gain.max(1e-12).log10()
}

/// Shared per-band gains; clones refer to the same values
#[derive(Clone)]
pub struct GainStage {
    gains: Arc<[AtomicU64; NUM_BANDS]>,
    min_db: f64,
    max_db: f64,
}

impl GainStage {
    /// Create a flat (0 dB) gain stage accepting gains in `[min_db, max_db]`
    pub fn new(min_db: f64, max_db: f64) -> Self {
        Self {
            gains: Arc::new(std::array::from_fn(|_| AtomicU64::new(1.0f64.to_bits()))),
            min_db,
            max_db,
        }
    }

    pub fn from_config(config: &EqualizerConfig) -> Self {
        Self::new(config.min_gain_db, config.max_gain_db)
    }

    /// Set the gain of band `band_index` in dB
    ///
    /// Rejects an invalid band index or a dB value outside the configured
    /// range with `OutOfRange`; the previous gain is kept in that case.
    pub fn set_gain_db(&self, band_index: usize, db: f64) -> Result<()> {
        let band = Band::from_index(band_index)
            .ok_or_else(|| EqError::OutOfRange(format!("band index {} (expected 0..{})", band_index, NUM_BANDS)))?;
        self.set_band_gain_db(band, db)
    }

    /// Set the gain of `band` in dB
    pub fn set_band_gain_db(&self, band: Band, db: f64) -> Result<()> {
        if !db.is_finite() || db < self.min_db || db > self.max_db {
            return Err(EqError::OutOfRange(format!(
                "{} dB for {} band (allowed {} to {} dB)",
                db,
                band.name(),
                self.min_db,
                self.max_db
            )));
        }

        self.gains[band.index()].store(db_to_linear(db).to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Current linear gains [low, mid, high]
    #[inline]
    pub fn gains(&self) -> [f64; NUM_BANDS] {
        std::array::from_fn(|i| f64::from_bits(self.gains[i].load(Ordering::Relaxed)))
    }

    /// Current linear gain of one band
    pub fn gain(&self, band: Band) -> f64 {
        f64::from_bits(self.gains[band.index()].load(Ordering::Relaxed))
    }

    /// Current gains in dB
    pub fn gains_db(&self) -> [f64; NUM_BANDS] {
        self.gains().map(linear_to_db)
    }

    /// Return every band to 0 dB
    pub fn reset(&self) {
        for gain in self.gains.iter() {
            gain.store(1.0f64.to_bits(), Ordering::Relaxed);
        }
    }

    /// Accepted gain range in dB
    pub fn range_db(&self) -> (f64, f64) {
        (self.min_db, self.max_db)
    }
}

impl Default for GainStage {
    fn default() -> Self {
        Self::from_config(&EqualizerConfig::default())
    }
}
