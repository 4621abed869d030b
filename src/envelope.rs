//! Attack/release follower used by every smoothed scalar in the pipeline.
//!
//! The same primitive backs the bass envelope and floor (rates in 1/s), the
//! scene visibility and star brightness (fractions per frame) and the walker
//! motion and gaze (fractions per 60 fps frame, converted for the actual dt).

use crate::math::{clamp01, finite_or, frame_fraction, rate_fraction};

/// How `attack`/`release` are interpreted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Fixed fraction of the gap closed per update, regardless of dt
    PerFrame,

    /// Fraction of the gap closed per 60 fps frame, rescaled for dt
    PerReferenceFrame,

    /// First-order time constant expressed as a rate (1/s)
    PerSecond,
}

/// Asymmetric first-order follower
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub value: f32,
    pub attack: f32,
    pub release: f32,
    pub mode: Rate,
}

impl Envelope {
    pub fn new(attack: f32, release: f32, mode: Rate) -> Self {
        Self {
            value: 0.0,
            attack,
            release,
            mode,
        }
    }

    pub fn per_frame(attack: f32, release: f32) -> Self {
        Self::new(attack, release, Rate::PerFrame)
    }

    pub fn per_reference_frame(attack: f32, release: f32) -> Self {
        Self::new(attack, release, Rate::PerReferenceFrame)
    }

    pub fn per_second(attack: f32, release: f32) -> Self {
        Self::new(attack, release, Rate::PerSecond)
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = value;
        self
    }

    /// Blend fraction for a step of `dt_s` in the given direction
    pub fn fraction(&self, rising: bool, dt_s: f32) -> f32 {
        let r = if rising { self.attack } else { self.release };
        match self.mode {
            Rate::PerFrame => clamp01(r),
            Rate::PerReferenceFrame => frame_fraction(r, dt_s),
            Rate::PerSecond => rate_fraction(r, dt_s),
        }
    }

    /// Move toward `target` and return the new value.
    ///
    /// The blend fraction is within [0, 1], so the value never crosses the target.
    pub fn update(&mut self, target: f32, dt_s: f32) -> f32 {
        let target = finite_or(target, 0.0);
        let dt_s = finite_or(dt_s, 0.0);
        let k = self.fraction(target > self.value, dt_s);
        self.value += (target - self.value) * k;
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_faster_than_release() {
        let mut env = Envelope::per_frame(0.5, 0.1);
        env.update(1.0, 1.0 / 60.0);
        assert!((env.value - 0.5).abs() < 1e-6);

        env.update(0.0, 1.0 / 60.0);
        assert!((env.value - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_converges_without_overshoot() {
        for mode in [Rate::PerFrame, Rate::PerReferenceFrame, Rate::PerSecond] {
            let (a, r) = match mode {
                Rate::PerSecond => (18.0, 6.0),
                _ => (0.12, 0.055),
            };
            let mut env = Envelope::new(a, r, mode).with_value(0.1);
            for _ in 0..600 {
                let v = env.update(0.8, 1.0 / 60.0);
                assert!(v <= 0.8 + 1e-6, "{mode:?} overshot: {v}");
            }
            assert!((env.value - 0.8).abs() < 0.008, "{mode:?} stuck at {}", env.value);
        }
    }

    #[test]
    fn test_nan_target_is_neutral() {
        let mut env = Envelope::per_frame(0.5, 0.5).with_value(0.4);
        env.update(f32::NAN, 1.0 / 60.0);
        assert!(env.value.is_finite());
        assert!((env.value - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_dt_scaling_is_frame_rate_independent() {
        let mut fast = Envelope::per_reference_frame(0.12, 0.055);
        let mut slow = Envelope::per_reference_frame(0.12, 0.055);

        for _ in 0..120 {
            fast.update(1.0, 1.0 / 120.0);
        }
        for _ in 0..60 {
            slow.update(1.0, 1.0 / 60.0);
        }
        assert!((fast.value - slow.value).abs() < 1e-3);
    }
}
