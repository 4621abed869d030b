//! Scene director: the smoothed scalars every renderer scales against.
//!
//! Visibility and motion are the single source of truth for "how much is
//! happening". Gaze blends the walking direction with the pointer, and the
//! scrub spring ties seek dragging into the walker's posture.

use glam::Vec2;

use super::spring::{ScrubSpring, SpringDrive};
use crate::audio::BandEnergies;
use crate::envelope::Envelope;
use crate::math::{clamp, clamp01, finite_or, frame_fraction, lerp, smoothstep};
use crate::params::{SceneConfig, WalkerConfig};

/// Everything the director needs from the frame
#[derive(Debug, Clone, Copy)]
pub struct DirectorInput {
    pub bands: BandEnergies,
    pub kick: f32,
    pub playing: bool,

    /// Clamped frame delta (seconds)
    pub dt: f32,

    /// Wall clock (seconds)
    pub t_now: f32,

    /// Scene canvas size (device px)
    pub width: f32,
    pub height: f32,
    pub dpr: f32,

    /// Playback progress in [0, 1]
    pub progress: f32,

    /// Pointer on the scene canvas (device px)
    pub pointer: Option<Vec2>,

    pub seek_held: bool,
    pub seek_pull: f32,
}

/// Derived scene state for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneFrame {
    pub raw_energy: f32,
    pub visibility: f32,
    pub motion: f32,
    pub phase: f32,

    /// Walk direction, ±1
    pub dir: f32,

    pub walker_x: f32,
    pub walker_alpha: f32,

    /// Ground line (device px)
    pub horizon: f32,

    /// Foot baseline including the scrub lift (device px)
    pub foot_y: f32,

    pub hang: f32,
    pub pull: f32,
    pub grounded: bool,

    pub base_yaw: f32,
    pub look_yaw: f32,
    pub look_pitch: f32,
    pub look_active: f32,
    pub body_yaw: f32,
}

/// Bottom padding between the ground line and the canvas edge (CSS px)
const FRAME_PAD_PX: f32 = 2.0;

pub struct SceneDirector {
    scene: SceneConfig,
    walker: WalkerConfig,
    visibility: Envelope,
    motion: Envelope,
    look_active: Envelope,
    look_yaw: f32,
    look_pitch: f32,
    phase: f32,
    dir: f32,
    prev_x: Option<f32>,
    spring: ScrubSpring,
    last: SceneFrame,
}

impl SceneDirector {
    pub fn new(scene: SceneConfig, walker: WalkerConfig) -> Self {
        Self {
            visibility: Envelope::per_frame(scene.vis_attack, scene.vis_release),
            motion: Envelope::per_reference_frame(walker.motion_attack, walker.motion_release),
            look_active: Envelope::per_reference_frame(
                walker.look_blend_attack,
                walker.look_blend_release,
            ),
            scene,
            walker,
            look_yaw: 0.0,
            look_pitch: 0.0,
            phase: 0.0,
            dir: 1.0,
            prev_x: None,
            spring: ScrubSpring::default(),
            last: SceneFrame::default(),
        }
    }

    pub fn last(&self) -> &SceneFrame {
        &self.last
    }

    pub fn spring(&self) -> &ScrubSpring {
        &self.spring
    }

    /// Weighted band sum, clamped to [0, 1]
    pub fn raw_energy(&self, bands: &BandEnergies, kick: f32) -> f32 {
        let [wb, wm, wa, wk] = self.scene.energy_weights;
        clamp01(bands.bass * wb + bands.mids * wm + bands.air * wa + kick * wk)
    }

    pub fn update(&mut self, input: &DirectorInput) -> SceneFrame {
        let dt = finite_or(input.dt, 0.0).max(0.0);
        let dpr = finite_or(input.dpr, 1.0).max(0.1);
        let w = finite_or(input.width, 0.0).max(1.0);
        let h = finite_or(input.height, 0.0).max(1.0);
        let bands = BandEnergies {
            bass: clamp01(finite_or(input.bands.bass, 0.0)),
            mids: clamp01(finite_or(input.bands.mids, 0.0)),
            air: clamp01(finite_or(input.bands.air, 0.0)),
        };
        let kick = clamp01(finite_or(input.kick, 0.0));
        let wc = &self.walker;

        // Visibility
        let raw_energy = self.raw_energy(&bands, kick);
        let target_vis = if input.playing {
            clamp01((raw_energy - self.scene.silence_floor) / self.scene.silence_span.max(1e-6))
        } else {
            0.0
        };
        let visibility = self.visibility.update(target_vis, dt);

        // Track position and sticky direction
        let horizon = (h - FRAME_PAD_PX * dpr).floor();
        let progress = clamp01(finite_or(input.progress, 0.0));
        let walker_x = lerp(w * wc.track_left, w * wc.track_right, progress);
        if let Some(prev) = self.prev_x {
            let dx = walker_x - prev;
            if dx.abs() > 1e-4 {
                self.dir = dx.signum();
            }
        }
        self.prev_x = Some(walker_x);
        let dir = self.dir;

        // Motion and gait phase
        let target_motion = if input.playing {
            clamp01(0.18 + visibility * 0.92)
        } else {
            0.0
        };
        let motion = self.motion.update(target_motion, dt);
        let walker_alpha = clamp(
            0.12 + visibility * 0.72 + bands.bass * 0.12 + kick * 0.18,
            0.1,
            0.95,
        );
        let speed_target = wc.base_speed + bands.mids * wc.speed_gain + kick * wc.kick_speed_gain;
        self.phase += dt * lerp(wc.idle_speed, speed_target, motion);
        let phase = self.phase;

        // Scrub spring
        let pull = if input.seek_held {
            clamp(finite_or(input.seek_pull, 0.0), -1.0, 1.0)
        } else {
            0.0
        };
        self.spring.update(
            &SpringDrive {
                held: input.seek_held,
                pull,
                t_now: input.t_now,
                phase,
                dpr,
                dt,
            },
            wc,
        );
        let hang = self.spring.hang(wc, dpr);
        let foot_y = horizon + self.spring.y;
        let grounded = self.spring.grounded();

        // Gaze
        let max_yaw = wc.look_max_yaw;
        let max_pitch = wc.look_max_pitch;
        let base_yaw = dir * lerp(0.18, 0.92, smoothstep(0.08, 0.72, motion));

        let (want_look, mouse_yaw, mouse_pitch) = match input.pointer {
            Some(p) => {
                let head_y = foot_y - 60.0 * dpr;
                let yaw_n = clamp((p.x - walker_x) / (w * 0.32), -1.0, 1.0);
                let pitch_n = clamp((p.y - head_y) / (h * 0.28), -1.0, 1.0);
                let yaw_shaped = yaw_n.signum() * yaw_n.abs().powf(0.85);
                let pitch_shaped = pitch_n.signum() * pitch_n.abs().powf(0.9);
                let weight = 0.55 + 0.45 * motion;
                (
                    1.0,
                    yaw_shaped * max_yaw * weight,
                    pitch_shaped * max_pitch * weight,
                )
            }
            None => (0.0, 0.0, 0.0),
        };

        let look_active = self.look_active.update(want_look, dt);
        let desired_yaw = lerp(base_yaw, mouse_yaw, look_active);

        // Keep the head from turning past the travel direction while walking
        let max_back = max_yaw * lerp(1.0, 0.22, smoothstep(0.15, 0.65, motion));
        let (mut yaw_min, mut yaw_max) = (-max_yaw, max_yaw);
        if motion > 0.12 {
            if dir >= 0.0 {
                yaw_min = -max_back;
            } else {
                yaw_max = max_back;
            }
        }
        let desired_yaw = clamp(desired_yaw, yaw_min, yaw_max);
        let desired_pitch = lerp(0.0, mouse_pitch, look_active);

        let speed = 0.35 + motion * 0.65;
        let att = frame_fraction(wc.look_attack * speed, dt);
        let rel = frame_fraction(wc.look_release * speed, dt);

        let k = if desired_yaw.abs() > self.look_yaw.abs() { att } else { rel };
        self.look_yaw = clamp(
            self.look_yaw + (desired_yaw - self.look_yaw) * k,
            -max_yaw,
            max_yaw,
        );
        let k = if desired_pitch.abs() > self.look_pitch.abs() { att } else { rel };
        self.look_pitch = clamp(
            self.look_pitch + (desired_pitch - self.look_pitch) * k,
            -max_pitch,
            max_pitch,
        );

        let body_yaw = clamp(
            lerp(base_yaw, self.look_yaw, look_active * (0.35 + 0.25 * motion)),
            -max_yaw,
            max_yaw,
        );

        self.last = SceneFrame {
            raw_energy,
            visibility,
            motion,
            phase,
            dir,
            walker_x,
            walker_alpha,
            horizon,
            foot_y,
            hang,
            pull,
            grounded,
            base_yaw,
            look_yaw: self.look_yaw,
            look_pitch: self.look_pitch,
            look_active,
            body_yaw,
        };
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(playing: bool, bass: f32) -> DirectorInput {
        DirectorInput {
            bands: BandEnergies {
                bass,
                mids: bass * 0.5,
                air: 0.0,
            },
            kick: 0.0,
            playing,
            dt: 1.0 / 60.0,
            t_now: 0.0,
            width: 960.0,
            height: 224.0,
            dpr: 1.0,
            progress: 0.5,
            pointer: None,
            seek_held: false,
            seek_pull: 0.0,
        }
    }

    fn director() -> SceneDirector {
        SceneDirector::new(SceneConfig::default(), WalkerConfig::default())
    }

    #[test]
    fn test_silence_reads_zero_visibility() {
        let mut d = director();
        let mut frame = SceneFrame::default();
        for _ in 0..120 {
            frame = d.update(&input(true, 0.005));
        }
        assert_eq!(frame.visibility, 0.0);
        // Playing keeps a floor of motion even in silence
        assert!((frame.motion - 0.18).abs() < 0.01);
    }

    #[test]
    fn test_visibility_rises_and_falls_gracefully() {
        let mut d = director();
        let first = d.update(&input(true, 0.5));
        assert!(first.visibility > 0.0 && first.visibility <= 0.1 + 1e-6);

        for _ in 0..200 {
            d.update(&input(true, 0.5));
        }
        assert!(d.last().visibility > 0.99);

        // Pausing releases slowly, one step at a time
        let paused = d.update(&input(false, 0.5));
        assert!(paused.visibility > 0.95);
    }

    #[test]
    fn test_walker_position_and_direction() {
        let mut d = director();
        let mut i = input(true, 0.2);
        i.progress = 0.0;
        assert!((d.update(&i).walker_x - 960.0 * 0.12).abs() < 1e-3);

        i.progress = 0.3;
        assert_eq!(d.update(&i).dir, 1.0);

        i.progress = 0.1; // seek backward
        assert_eq!(d.update(&i).dir, -1.0);

        // Stationary keeps the last direction
        assert_eq!(d.update(&i).dir, -1.0);
    }

    #[test]
    fn test_phase_idles_when_paused() {
        let mut d = director();
        let mut i = input(false, 0.0);
        i.dt = 0.05;
        let f = d.update(&i);
        assert!((f.phase - 0.05 * 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_backward_glance_is_limited_when_moving() {
        let mut d = director();
        let mut i = input(true, 0.8);
        i.pointer = Some(Vec2::new(0.0, 100.0)); // far behind a rightward walker

        for k in 0..400 {
            i.progress = 0.2 + k as f32 * 1e-4;
            d.update(&i);
        }
        let f = *d.last();
        assert!(f.motion > 0.9);
        let max_back = 0.95 * 0.22;
        assert!(f.look_yaw >= -max_back - 1e-4, "yaw {}", f.look_yaw);
        assert!(f.look_active > 0.99);
    }

    #[test]
    fn test_pointer_gaze_when_idle() {
        let mut d = director();
        let mut i = input(false, 0.0);
        i.pointer = Some(Vec2::new(0.0, 0.0));
        for _ in 0..600 {
            d.update(&i);
        }
        let f = *d.last();
        // Idle: full backward range allowed, weight 0.55
        assert!(f.look_yaw < -0.4);
        assert!(f.look_pitch < 0.0);
        assert!(f.look_yaw >= -0.95 && f.look_pitch >= -0.55);
    }

    #[test]
    fn test_scrub_lifts_walker() {
        let mut d = director();
        let mut i = input(true, 0.2);
        i.seek_held = true;
        i.seek_pull = 0.5;
        for _ in 0..90 {
            d.update(&i);
        }
        let f = *d.last();
        assert!(f.hang > 0.8);
        assert!(!f.grounded);
        assert!(f.foot_y < f.horizon);
        assert_eq!(f.pull, 0.5);
    }

    #[test]
    fn test_non_finite_inputs_stay_finite() {
        let mut d = director();
        let mut i = input(true, f32::NAN);
        i.dt = f32::NAN;
        i.width = f32::INFINITY;
        i.progress = f32::NAN;
        let f = d.update(&i);
        assert!(f.visibility.is_finite() && f.walker_x.is_finite() && f.phase.is_finite());
    }
}
