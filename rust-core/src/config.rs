//! Equalizer configuration surface
//!
//! Plain struct with defaults; presets can be stored as JSON.

use crate::error::{EqError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of equalizer bands (low, mid, high)
pub const NUM_BANDS: usize = 3;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    /// Engine sample rate in Hz
    pub sample_rate: u32,

    /// Samples per processed block (also the playback frame size)
    pub block_size: usize,

    /// FIR length per band
    pub num_taps: usize,

    /// Band edges in Hz, `[low, high]` per band
    pub band_edges: [[f64; 2]; NUM_BANDS],

    /// Lowest accepted gain in dB
    pub min_gain_db: f64,

    /// Highest accepted gain in dB
    pub max_gain_db: f64,

    /// Monitor queue capacity in blocks
    pub monitor_capacity: usize,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            block_size: 1024,
            num_taps: 101,
            band_edges: [[20.0, 200.0], [200.0, 2000.0], [2000.0, 20000.0]],
            min_gain_db: -12.0,
            max_gain_db: 12.0,
            monitor_capacity: 10,
        }
    }
}

impl EqualizerConfig {
    /// Load a preset from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| EqError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| EqError::InvalidConfig(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Check everything except band edges (those are checked by the filter bank)
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EqError::InvalidConfig("sample rate must be positive".into()));
        }
        if self.block_size == 0 {
            return Err(EqError::InvalidConfig("block size must be positive".into()));
        }
        if self.num_taps == 0 {
            return Err(EqError::InvalidConfig("tap count must be at least 1".into()));
        }
        if self.monitor_capacity == 0 {
            return Err(EqError::InvalidConfig("monitor capacity must be positive".into()));
        }
        if !(self.min_gain_db.is_finite()
            && self.max_gain_db.is_finite()
            && self.min_gain_db <= 0.0
            && self.max_gain_db >= 0.0)
        {
            return Err(EqError::InvalidConfig(format!(
                "gain range [{}, {}] dB must contain 0 dB",
                self.min_gain_db, self.max_gain_db
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EqualizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.num_taps, 101);
        assert_eq!(config.monitor_capacity, 10);
        assert!((config.nyquist() - 22050.0).abs() < 1e-10);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let config = EqualizerConfig { block_size: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EqError::InvalidConfig(_))));

        let config = EqualizerConfig { num_taps: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(EqError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_gain_range_without_unity() {
        let config = EqualizerConfig { min_gain_db: 1.0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EqualizerConfig = serde_json::from_str(r#"{ "num_taps": 255 }"#).unwrap();
        assert_eq!(config.num_taps, 255);
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.band_edges[1], [200.0, 2000.0]);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("band_eq_config_{}.json", std::process::id()));
        let config = EqualizerConfig { block_size: 512, max_gain_db: 6.0, ..Default::default() };

        config.save_json_file(&path).unwrap();
        let loaded = EqualizerConfig::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
