//! Bass envelope, adaptive floor, kick strength and cooldown-gated beats.
//!
//! Not spectral flux: the floor is a slow follower of the bass envelope, and a
//! beat is a fast rise of the envelope over it (ratio or absolute delta).

use crate::envelope::Envelope;
use crate::math::{clamp01, decay, finite_or};
use crate::params::BeatConfig;

/// Detector output for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatFrame {
    pub bass_env: f32,
    pub floor: f32,

    /// Transient strength in [0, 1]
    pub kick: f32,

    /// True for exactly one update per qualifying transient
    pub beat: bool,

    /// 1 on a beat, decaying afterwards
    pub impulse: f32,

    /// Beats fired so far
    pub count: u64,

    /// Envelope over floor on this update
    pub ratio: f32,
}

pub struct BeatDetector {
    config: BeatConfig,
    env: Envelope,
    floor: Envelope,
    kick: f32,
    cooldown: f32,
    impulse: f32,
    count: u64,
    last: BeatFrame,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        Self {
            env: Envelope::per_second(config.env_attack, config.env_release),
            floor: Envelope::per_second(config.floor_rate, config.floor_rate),
            config,
            kick: 0.0,
            cooldown: 0.0,
            impulse: 0.0,
            count: 0,
            last: BeatFrame::default(),
        }
    }

    /// Start from a given envelope and floor
    pub fn with_state(mut self, bass_env: f32, floor: f32) -> Self {
        self.env.value = bass_env;
        self.floor.value = floor;
        self
    }

    pub fn last(&self) -> &BeatFrame {
        &self.last
    }

    pub fn update(&mut self, bass: f32, playing: bool, dt_s: f32) -> BeatFrame {
        let c = &self.config;
        let dt = finite_or(dt_s, 0.0).max(0.0);

        let env = self.env.update(clamp01(finite_or(bass, 0.0)), dt);
        let floor = self.floor.update(env, dt);

        let delta = (env - floor).max(0.0);
        let kick_target = clamp01(delta / c.kick_span.max(1e-6));
        self.kick = (self.kick * decay(c.kick_decay, dt)).max(kick_target);

        self.cooldown = (self.cooldown - dt).max(0.0);
        let ratio = env / floor.max(1e-4);

        let beat = playing
            && self.cooldown <= 0.0
            && env > c.gate
            && (ratio > c.ratio || delta > c.delta);

        if beat {
            self.cooldown = c.cooldown_s;
            self.count += 1;
            tracing::trace!(count = self.count, env, floor, ratio, "beat");
        }

        self.impulse = (self.impulse * decay(c.impulse_decay, dt)).max(if beat { 1.0 } else { 0.0 });

        self.last = BeatFrame {
            bass_env: env,
            floor,
            kick: self.kick,
            beat,
            impulse: self.impulse,
            count: self.count,
            ratio,
        };
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_fast_attack_slow_floor() {
        let mut det = BeatDetector::new(BeatConfig::default()).with_state(0.02, 0.02);

        let mut frames = Vec::new();
        for _ in 0..20 {
            frames.push(det.update(0.5, true, DT));
        }

        // Fast attack: most of the way there within a handful of frames
        assert!(frames[4].bass_env > 0.38, "env after 5 frames: {}", frames[4].bass_env);
        assert!(frames[7].bass_env > 0.45, "env after 8 frames: {}", frames[7].bass_env);

        // Slow floor: under 0.1 for the first ~200 ms, far below the envelope after 20 frames
        assert!(frames[11].floor < 0.1, "floor after 12 frames: {}", frames[11].floor);
        assert!(frames[19].floor < 0.16, "floor after 20 frames: {}", frames[19].floor);
        assert!(frames[19].ratio > 3.0);
    }

    #[test]
    fn test_onset_fires_once_then_cools_down() {
        let mut det = BeatDetector::new(BeatConfig::default()).with_state(0.02, 0.02);

        let beats: Vec<bool> = (0..10).map(|_| det.update(0.5, true, DT).beat).collect();
        assert!(beats[0] || beats[1]);
        assert_eq!(beats.iter().filter(|&&b| b).count(), 1);

        // 0.18 s cooldown is 11 frames at 60 fps
        let later: Vec<bool> = (0..3).map(|_| det.update(0.5, true, DT).beat).collect();
        assert!(later.iter().any(|&b| b));
        assert_eq!(det.last().count, 2);
    }

    #[test]
    fn test_no_beat_while_paused() {
        let mut det = BeatDetector::new(BeatConfig::default()).with_state(0.02, 0.02);
        for _ in 0..30 {
            let f = det.update(0.8, false, DT);
            assert!(!f.beat);
            assert!(f.kick >= 0.0);
        }
        assert_eq!(det.last().count, 0);
    }

    #[test]
    fn test_quiet_bass_is_gated() {
        let mut det = BeatDetector::new(BeatConfig::default()).with_state(0.001, 0.001);
        // Ratio is huge but the envelope stays under the 0.08 gate
        for _ in 0..30 {
            assert!(!det.update(0.05, true, DT).beat);
        }
    }

    #[test]
    fn test_impulse_and_kick_decay() {
        let mut det = BeatDetector::new(BeatConfig::default()).with_state(0.02, 0.02);
        det.update(0.9, true, DT);
        let peak = det.update(0.9, true, DT);
        assert!(peak.impulse > 0.8);

        let mut f = peak;
        for _ in 0..60 {
            f = det.update(0.0, true, DT);
        }
        assert!(f.impulse < 0.01);
        assert!(f.kick < peak.kick);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut det = BeatDetector::new(BeatConfig::default());
        let f = det.update(f32::NAN, true, f32::INFINITY);
        assert!(f.bass_env.is_finite() && f.floor.is_finite() && f.kick.is_finite());
    }
}
