//! Scene director and walker tuning.

use serde::{Deserialize, Serialize};

/// Scene visibility: how band energy becomes the global "something is playing" level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Raw energy below this reads as silence
    pub silence_floor: f32,

    /// Raw energy span above the floor mapped to full visibility
    pub silence_span: f32,

    /// Visibility attack (per-frame fraction)
    pub vis_attack: f32,

    /// Visibility release (per-frame fraction)
    pub vis_release: f32,

    /// Energy weights: bass, mids, air, kick
    pub energy_weights: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            silence_floor: 0.012,
            silence_span: 0.09,
            vis_attack: 0.1,
            vis_release: 0.035,
            energy_weights: [0.68, 0.52, 0.3, 0.55],
        }
    }
}

/// Walker locomotion, gaze and scrub-spring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Gait phase speed at full motion (rad/s)
    pub base_speed: f32,

    /// Extra gait speed per unit of mids (rad/s)
    pub speed_gain: f32,

    /// Extra gait speed per unit of kick (rad/s)
    pub kick_speed_gain: f32,

    /// Gait phase speed when idle (rad/s)
    pub idle_speed: f32,

    /// Stride amplitude kept while playing at zero motion
    pub idle_stride: f32,

    /// Motion attack (fraction per 60 fps frame)
    pub motion_attack: f32,

    /// Motion release (fraction per 60 fps frame)
    pub motion_release: f32,

    /// Idle bob amplitude (CSS px)
    pub idle_bob_px: f32,

    /// Idle sway amplitude (CSS px)
    pub idle_sway_px: f32,

    /// Walk track start (fraction of width)
    pub track_left: f32,

    /// Walk track end (fraction of width)
    pub track_right: f32,

    /// Maximum head yaw (normalized)
    pub look_max_yaw: f32,

    /// Maximum head pitch (normalized)
    pub look_max_pitch: f32,

    /// Gaze attack (fraction per 60 fps frame)
    pub look_attack: f32,

    /// Gaze release (fraction per 60 fps frame)
    pub look_release: f32,

    /// Pointer-gaze blend attack (fraction per 60 fps frame)
    pub look_blend_attack: f32,

    /// Pointer-gaze blend release (fraction per 60 fps frame)
    pub look_blend_release: f32,

    /// Maximum scrub lift (CSS px)
    pub seek_max_px: f32,

    /// Fall acceleration after scrub release (CSS px/s^2)
    pub gravity_px: f32,

    /// Scrub spring stiffness (1/s^2)
    pub spring_k: f32,

    /// Scrub spring damping (1/s)
    pub spring_d: f32,

    /// Bounce restitution on landing
    pub restitution: f32,

    /// Landing speed below which the spring settles (CSS px/s)
    pub settle_speed_px: f32,

    /// Track seconds per wall second mapped to full pull
    pub seek_velocity_span: f32,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            base_speed: 1.95,
            speed_gain: 2.05,
            kick_speed_gain: 1.2,
            idle_speed: 0.12,
            idle_stride: 0.28,
            motion_attack: 0.12,
            motion_release: 0.055,
            idle_bob_px: 0.95,
            idle_sway_px: 0.55,
            track_left: 0.12,
            track_right: 0.88,
            look_max_yaw: 0.95,
            look_max_pitch: 0.55,
            look_attack: 0.22,
            look_release: 0.14,
            look_blend_attack: 0.18,
            look_blend_release: 0.1,
            seek_max_px: 74.0,
            gravity_px: 1200.0,
            spring_k: 70.0,
            spring_d: 16.0,
            restitution: 0.22,
            settle_speed_px: 35.0,
            seek_velocity_span: 12.0,
        }
    }
}
