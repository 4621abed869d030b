//! Vertical scrub spring: lifts the walker while the seek bar is dragged.
//!
//! `y` is the offset from the ground in device pixels, negative upward.

use crate::math::{clamp01, finite_or};
use crate::params::WalkerConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrubSpring {
    /// Offset from rest (device px, ≤ 0)
    pub y: f32,

    /// Velocity (device px/s, positive = falling)
    pub v: f32,
}

/// Per-frame drive for the spring
#[derive(Debug, Clone, Copy)]
pub struct SpringDrive {
    pub held: bool,

    /// Normalized seek velocity in [-1, 1]
    pub pull: f32,

    /// Wall clock (seconds)
    pub t_now: f32,

    pub phase: f32,
    pub dpr: f32,
    pub dt: f32,
}

impl ScrubSpring {
    pub fn update(&mut self, drive: &SpringDrive, cfg: &WalkerConfig) {
        let dpr = finite_or(drive.dpr, 1.0).max(0.1);
        let dt = finite_or(drive.dt, 0.0).max(0.0);
        let mut y = finite_or(self.y, 0.0);
        let mut v = finite_or(self.v, 0.0);

        if drive.held {
            let target = -cfg.seek_max_px * dpr;
            let a = (target - y) * cfg.spring_k - v * cfg.spring_d;
            v += a * dt;
            y += v * dt;

            let wiggle = (drive.t_now * 9.0 + drive.phase * 0.35).sin()
                * (1.2 * dpr)
                * (0.25 + 0.75 * finite_or(drive.pull, 0.0).abs().min(1.0));
            y += wiggle;
        } else {
            v += cfg.gravity_px * dpr * dt;
            y += v * dt;
        }

        // Floor bounce
        if y > 0.0 {
            y = 0.0;
            if v > 0.0 {
                v *= -cfg.restitution;
            }
            if v.abs() < cfg.settle_speed_px * dpr {
                v = 0.0;
            }
        }

        self.y = y;
        self.v = v;
    }

    /// Lift as a fraction of the maximum, in [0, 1]
    pub fn hang(&self, cfg: &WalkerConfig, dpr: f32) -> f32 {
        clamp01(-self.y / (cfg.seek_max_px * dpr.max(0.1)))
    }

    pub fn grounded(&self) -> bool {
        self.y >= -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(held: bool) -> SpringDrive {
        SpringDrive {
            held,
            pull: 0.0,
            t_now: 0.0,
            phase: 0.0,
            dpr: 1.0,
            dt: 1.0 / 60.0,
        }
    }

    #[test]
    fn test_held_spring_lifts_toward_max() {
        let cfg = WalkerConfig::default();
        let mut spring = ScrubSpring::default();
        for i in 0..120 {
            let mut d = drive(true);
            d.t_now = i as f32 / 60.0;
            spring.update(&d, &cfg);
        }
        assert!(spring.hang(&cfg, 1.0) > 0.9);
        assert!(!spring.grounded());
    }

    #[test]
    fn test_release_falls_and_settles() {
        let cfg = WalkerConfig::default();
        let mut spring = ScrubSpring { y: -74.0, v: 0.0 };

        for _ in 0..180 {
            spring.update(&drive(false), &cfg);
            assert!(spring.y <= 0.0);
        }
        assert_eq!(spring.y, 0.0);
        assert_eq!(spring.v, 0.0);
        assert!(spring.grounded());
        assert_eq!(spring.hang(&cfg, 1.0), 0.0);
    }

    #[test]
    fn test_landing_bounces_with_restitution() {
        let cfg = WalkerConfig::default();
        // About to land fast
        let mut spring = ScrubSpring { y: -1.0, v: 600.0 };
        spring.update(&drive(false), &cfg);

        assert_eq!(spring.y, 0.0);
        let expected = -(600.0 + 1200.0 / 60.0) * 0.22;
        assert!((spring.v - expected).abs() < 1e-2);
    }

    #[test]
    fn test_dpr_scales_the_lift() {
        let cfg = WalkerConfig::default();
        let spring = ScrubSpring { y: -74.0, v: 0.0 };
        assert!((spring.hang(&cfg, 1.0) - 1.0).abs() < 1e-6);
        assert!((spring.hang(&cfg, 2.0) - 0.5).abs() < 1e-6);
    }
}
