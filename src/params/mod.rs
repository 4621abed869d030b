//! Parameter definitions with units and documented semantics.
//!
//! Every tuned constant of the pipeline lives here:
//! - Units (Hz, seconds, CSS pixels, per-frame fractions)
//! - Documented ranges and meanings
//! - Loadable from a single TOML file, missing keys take the defaults

mod ambient;
mod audio;
mod render;
mod scene;
mod spectrum;
mod still;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;

// Re-export all types
pub use ambient::{AmbientConfig, StarConfig};
pub use audio::{AnalyserConfig, BandConfig, BeatConfig};
pub use render::{RecordingConfig, RenderConfig};
pub use scene::{SceneConfig, WalkerConfig};
pub use spectrum::SpectrumConfig;
pub use still::{StillConfig, RIG_MULTIPLIER_RANGE, STILL_SCALE_RANGE};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqConfig {
    pub spectrum: SpectrumConfig,
    pub analyser: AnalyserConfig,
    pub bands: BandConfig,
    pub beat: BeatConfig,
    pub scene: SceneConfig,
    pub walker: WalkerConfig,
    pub stars: StarConfig,
    pub ambient: AmbientConfig,
    pub render: RenderConfig,
    pub still: StillConfig,
}

impl EqConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(text: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration (used by `eqwalker config`)
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.analyser.validate().map_err(EngineError::Config)?;
        self.still.validate().map_err(EngineError::Config)?;

        let s = &self.spectrum;
        if s.columns == 0 {
            return Err(EngineError::Config("spectrum.columns must be >= 1".into()));
        }
        if !(s.min_hz > 0.0 && s.max_hz > s.min_hz + 2.0) {
            return Err(EngineError::Config(format!(
                "spectrum range {}..{} Hz is empty",
                s.min_hz, s.max_hz
            )));
        }
        if self.stars.count_min > self.stars.count_max {
            return Err(EngineError::Config(
                "stars.count_min must not exceed stars.count_max".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EqConfig::from_toml(
            r#"
            [beat]
            ratio = 2.0

            [spectrum]
            columns = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.beat.ratio, 2.0);
        assert_eq!(config.beat.gate, 0.08);
        assert_eq!(config.spectrum.columns, 32);
        assert_eq!(config.spectrum.segments, 18);
    }

    #[test]
    fn test_still_section_parses() {
        let config = EqConfig::from_toml(
            r#"
            [still]
            leg = 1.4
            look_yaw = -0.3
            walk_dir = -1.0
            "#,
        )
        .unwrap();

        assert_eq!(config.still.leg, 1.4);
        assert_eq!(config.still.look_yaw, Some(-0.3));
        assert_eq!(config.still.body_yaw, None);
        assert_eq!(config.still.walk_dir, -1.0);
        assert_eq!(config.still.head, 1.0);
    }

    #[test]
    fn test_default_config_survives_toml() {
        let config = EqConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(EqConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EqConfig::from_toml("[spectrum]\ncolumns = 0\n").is_err());
        assert!(EqConfig::from_toml("[analyser]\nfft_size = 1000\n").is_err());
        assert!(EqConfig::from_toml("not toml at all = = =").is_err());
        assert!(EqConfig::from_toml("[still]\nhips = 0.1\n").is_err());
    }
}
