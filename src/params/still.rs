//! Still exporter tuning: rig proportions and the hand-set pose.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Accepted range for the proportion multipliers (1.0 = stock rig)
pub const RIG_MULTIPLIER_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Accepted range for the still's rig scale
pub const STILL_SCALE_RANGE: RangeInclusive<f32> = 2.0..=10.0;

/// Still walker settings. Yaw and pitch default to the chosen preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StillConfig {
    /// Rig unit per 420 px of the shorter canvas side
    pub scale: f32,

    /// Placement jitter in [0, 0.35]
    pub jitter: f32,

    /// Centre offset as a fraction of the shorter side, each in [-1, 1]
    pub offset_x: f32,
    pub offset_y: f32,

    /// Walk intensity in [0, 1]
    pub motion: f32,

    /// Gait phase (radians)
    pub phase: f32,

    /// Travel direction, 1 or -1
    pub walk_dir: f32,

    /// Preset overrides (normalized turn / tilt)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_yaw: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_yaw: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_pitch: Option<f32>,

    /// Crouch in [0, 1]
    pub crouch: f32,

    /// Scrub lift pose in [0, 1]
    pub hang: f32,

    /// Drag direction in [-1, 1]
    pub pull: f32,

    // Proportion multipliers
    pub head: f32,
    pub body: f32,
    pub arm: f32,
    pub leg: f32,
    pub shoulders: f32,
    pub hips: f32,
    pub visor_w: f32,
    pub visor_h: f32,
    pub pack: f32,

    /// Multiplier on bounce, sway and shimmy in [0, 1]
    pub motion_amp: f32,
}

impl Default for StillConfig {
    fn default() -> Self {
        Self {
            scale: 3.6,
            jitter: 0.08,
            offset_x: 0.0,
            offset_y: 0.0,
            motion: 0.65,
            phase: 1.2,
            walk_dir: 1.0,
            body_yaw: None,
            look_yaw: None,
            look_pitch: None,
            crouch: 0.0,
            hang: 0.0,
            pull: 0.0,
            head: 1.0,
            body: 1.0,
            arm: 1.0,
            leg: 1.0,
            shoulders: 1.0,
            hips: 1.0,
            visor_w: 1.0,
            visor_h: 1.0,
            pack: 1.0,
            motion_amp: 0.55,
        }
    }
}

fn check(name: &str, v: f32, range: RangeInclusive<f32>) -> Result<(), String> {
    if range.contains(&v) {
        Ok(())
    } else {
        Err(format!(
            "still.{} must be in [{}, {}], got {}",
            name,
            range.start(),
            range.end(),
            v
        ))
    }
}

impl StillConfig {
    pub fn validate(&self) -> Result<(), String> {
        check("scale", self.scale, STILL_SCALE_RANGE)?;
        check("jitter", self.jitter, 0.0..=0.35)?;
        check("offset_x", self.offset_x, -1.0..=1.0)?;
        check("offset_y", self.offset_y, -1.0..=1.0)?;
        check("motion", self.motion, 0.0..=1.0)?;
        if !self.phase.is_finite() {
            return Err(format!("still.phase must be finite, got {}", self.phase));
        }
        if self.walk_dir != 1.0 && self.walk_dir != -1.0 {
            return Err(format!("still.walk_dir must be 1 or -1, got {}", self.walk_dir));
        }
        if let Some(v) = self.body_yaw {
            check("body_yaw", v, -0.95..=0.95)?;
        }
        if let Some(v) = self.look_yaw {
            check("look_yaw", v, -0.95..=0.95)?;
        }
        if let Some(v) = self.look_pitch {
            check("look_pitch", v, -0.55..=0.55)?;
        }
        check("crouch", self.crouch, 0.0..=1.0)?;
        check("hang", self.hang, 0.0..=1.0)?;
        check("pull", self.pull, -1.0..=1.0)?;
        for (name, v) in [
            ("head", self.head),
            ("body", self.body),
            ("arm", self.arm),
            ("leg", self.leg),
            ("shoulders", self.shoulders),
            ("hips", self.hips),
            ("visor_w", self.visor_w),
            ("visor_h", self.visor_h),
            ("pack", self.pack),
        ] {
            check(name, v, RIG_MULTIPLIER_RANGE)?;
        }
        check("motion_amp", self.motion_amp, 0.0..=1.0)
    }
}
