//! Star field, background pixels, particles and wave line.

use serde::{Deserialize, Serialize};

/// Column-bound stars with pulse rings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarConfig {
    /// Canvas area (device px^2) per star
    pub area_per_star: f32,

    /// Minimum star count
    pub count_min: usize,

    /// Maximum star count
    pub count_max: usize,

    /// Core radius (CSS px)
    pub core_r_base: f32,

    /// Random extra core radius (CSS px)
    pub core_r_jitter: f32,

    /// Core alpha at rest
    pub core_alpha_base: f32,

    /// Core alpha at full level
    pub core_alpha_max: f32,

    /// Core attack (per-frame fraction)
    pub core_attack: f32,

    /// Core release (per-frame fraction)
    pub core_release: f32,

    /// Breathing speed (rad/s)
    pub breath_speed: f32,

    /// Ring radius at birth (CSS px)
    pub ring_r_min: f32,

    /// Ring radius when fully faded (CSS px)
    pub ring_r_max: f32,

    /// Ring thickness when fully faded (CSS px)
    pub ring_thick_min: f32,

    /// Ring thickness at birth (CSS px)
    pub ring_thick_max: f32,

    /// Ring alpha floor
    pub ring_alpha_base: f32,

    /// Ring alpha gain
    pub ring_alpha_gain: f32,

    /// Ring age advance (1/s)
    pub pulse_speed: f32,

    /// Maximum concurrent rings per star
    pub pulse_max: usize,

    /// Column level gain into star input
    pub gain: f32,

    /// Flow pulse rate at zero input (1/s)
    pub pulse_rate_min: f32,

    /// Flow pulse rate per unit input (1/s)
    pub pulse_rate_gain: f32,

    /// Flow pulse rate per unit kick (1/s)
    pub pulse_rate_kick_gain: f32,

    /// Input needed for flow pulses
    pub pulse_gate: f32,

    /// Minimum time between rings of one star (seconds)
    pub pulse_cooldown_s: f32,

    /// Input needed for beat pulses
    pub beat_gate: f32,
}

impl Default for StarConfig {
    fn default() -> Self {
        Self {
            area_per_star: 76000.0,
            count_min: 12,
            count_max: 18,
            core_r_base: 3.6,
            core_r_jitter: 1.6,
            core_alpha_base: 0.12,
            core_alpha_max: 0.95,
            core_attack: 0.06,
            core_release: 0.035,
            breath_speed: 0.18,
            ring_r_min: 2.0,
            ring_r_max: 80.0,
            ring_thick_min: 1.0,
            ring_thick_max: 3.2,
            ring_alpha_base: 0.1,
            ring_alpha_gain: 1.05,
            pulse_speed: 0.46,
            pulse_max: 4,
            gain: 0.62,
            pulse_rate_min: 0.16,
            pulse_rate_gain: 2.35,
            pulse_rate_kick_gain: 1.15,
            pulse_gate: 0.03,
            pulse_cooldown_s: 0.12,
            beat_gate: 0.26,
        }
    }
}

/// Background twinkle, footstep dust and horizon wave
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    /// Canvas area (device px^2) per background pixel
    pub bg_area_per_pixel: f32,

    /// Minimum background pixel count
    pub bg_min: usize,

    /// Maximum background pixel count
    pub bg_max: usize,

    /// Particles emitted per footstep
    pub particles_per_step: usize,

    /// Downward particle acceleration (CSS px/s^2)
    pub particle_gravity_px: f32,

    /// Minimum walker motion for footstep dust
    pub particle_motion_gate: f32,

    /// Minimum bass + kick for footstep dust
    pub particle_energy_gate: f32,

    /// Scene scanline alpha (scaled by 0.55 when drawn)
    pub scan_alpha: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            bg_area_per_pixel: 5200.0,
            bg_min: 220,
            bg_max: 360,
            particles_per_step: 6,
            particle_gravity_px: 115.0,
            particle_motion_gate: 0.28,
            particle_energy_gate: 0.16,
            scan_alpha: 0.045,
        }
    }
}
