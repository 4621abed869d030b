//! Audio analysis, band extraction and beat detection parameters.

use serde::{Deserialize, Serialize};

/// Spectral analyser configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT window size (must be power of 2)
    pub fft_size: usize,

    /// Temporal smoothing of magnitudes (0 = none, <1)
    pub smoothing: f32,

    /// Magnitude mapped to byte 0 (dB)
    pub min_db: f32,

    /// Magnitude mapped to byte 255 (dB)
    pub max_db: f32,

    /// Initial output gain (0-1)
    pub volume: f32,

    /// Time constant of gain changes (seconds)
    pub volume_ramp_s: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 16384,
            smoothing: 0.22,
            min_db: -100.0,
            max_db: -20.0,
            volume: 0.9,
            volume_ramp_s: 0.03,
        }
    }
}

impl AnalyserConfig {
    /// Number of frequency bins produced per snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 32 {
            return Err(format!(
                "FFT size must be a power of 2 >= 32, got {}",
                self.fft_size
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be in [0, 1), got {}",
                self.smoothing
            ));
        }
        if self.max_db <= self.min_db {
            return Err(format!(
                "max_db ({}) must be above min_db ({})",
                self.max_db, self.min_db
            ));
        }
        Ok(())
    }
}

/// Broad energy bands extracted each frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandConfig {
    /// Bass range (Hz)
    pub bass_hz: (f32, f32),

    /// Mid range (Hz)
    pub mids_hz: (f32, f32),

    /// Air / presence range (Hz)
    pub air_hz: (f32, f32),

    /// Star band attack (per-frame fraction)
    pub star_attack: f32,

    /// Star band release (per-frame fraction)
    pub star_release: f32,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            bass_hz: (35.0, 180.0),
            mids_hz: (250.0, 2600.0),
            air_hz: (2400.0, 12000.0),
            star_attack: 0.085,
            star_release: 0.04,
        }
    }
}

/// Bass envelope, adaptive floor and beat gating.
///
/// The gate, ratio and delta thresholds are empirically tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Bass envelope attack rate (1/s)
    pub env_attack: f32,

    /// Bass envelope release rate (1/s)
    pub env_release: f32,

    /// Adaptive floor follow rate (1/s)
    pub floor_rate: f32,

    /// Envelope-over-floor delta mapped to kick = 1
    pub kick_span: f32,

    /// Kick decay rate (1/s)
    pub kick_decay: f32,

    /// Minimum bass envelope for a beat
    pub gate: f32,

    /// Envelope / floor ratio that fires a beat
    pub ratio: f32,

    /// Envelope - floor delta that fires a beat
    pub delta: f32,

    /// Minimum time between beats (seconds)
    pub cooldown_s: f32,

    /// Beat impulse decay rate (1/s)
    pub impulse_decay: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            env_attack: 18.0,
            env_release: 6.0,
            floor_rate: 1.1,
            kick_span: 0.18,
            kick_decay: 7.0,
            gate: 0.08,
            ratio: 1.65,
            delta: 0.105,
            cooldown_s: 0.18,
            impulse_decay: 6.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyser_config_validation() {
        assert!(AnalyserConfig::default().validate().is_ok());

        let bad_size = AnalyserConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(bad_size.validate().is_err());

        let bad_range = AnalyserConfig {
            min_db: -20.0,
            max_db: -30.0,
            ..Default::default()
        };
        assert!(bad_range.validate().is_err());
    }

    #[test]
    fn test_bin_count_is_half_fft() {
        let config = AnalyserConfig::default();
        assert_eq!(config.bin_count(), 8192);
    }
}
