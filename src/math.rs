//! Scalar helpers shared by the analysis and drawing code.
//!
//! Everything here is pure. NaN inputs never panic; where it matters they are
//! mapped to a neutral value with [`finite_or`].

use std::f32::consts::TAU;

/// Frame rate that per-frame smoothing fractions are expressed against
pub const REFERENCE_FPS: f32 = 60.0;

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    x.max(lo).min(hi)
}

#[inline]
pub fn clamp01(x: f32) -> f32 {
    clamp(x, 0.0, 1.0)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite step between two edges; degenerate edges behave like a hard step
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp01((x - edge0) / (edge1 - edge0).max(1e-9));
    t * t * (3.0 - 2.0 * t)
}

/// Replace NaN and infinities with `fallback`
#[inline]
pub fn finite_or(x: f32, fallback: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// `count` log-spaced values from `min` to `max` inclusive
pub fn log_space(min: f32, max: f32, count: usize) -> Vec<f32> {
    let a = min.ln();
    let b = max.ln();
    (0..count)
        .map(|i| {
            let t = if count <= 1 {
                0.0
            } else {
                i as f32 / (count - 1) as f32
            };
            (a + (b - a) * t).exp()
        })
        .collect()
}

/// Convert a fraction-per-60fps-frame into the fraction for a frame of `dt_s`
pub fn frame_fraction(k: f32, dt_s: f32) -> f32 {
    let k = clamp01(k);
    clamp01(1.0 - (1.0 - k).powf(dt_s.max(0.0) * REFERENCE_FPS))
}

/// Blend fraction of a first-order follower with `rate` (1/s) over `dt_s`
pub fn rate_fraction(rate: f32, dt_s: f32) -> f32 {
    clamp01(1.0 - (-dt_s.max(0.0) * rate.max(0.0)).exp())
}

/// Exponential decay multiplier over `dt_s`
pub fn decay(rate: f32, dt_s: f32) -> f32 {
    (-dt_s.max(0.0) * rate.max(0.0)).exp()
}

/// Wrap an angle into [0, 2π)
pub fn wrap_tau(phase: f32) -> f32 {
    phase.rem_euclid(TAU)
}

/// Axis label for a frequency: "63", "1.0k", "16k"
pub fn format_hz(hz: f32) -> String {
    if hz >= 1000.0 {
        let k = hz / 1000.0;
        if k >= 10.0 {
            format!("{:.0}k", k)
        } else {
            format!("{:.1}k", k)
        }
    } else {
        format!("{}", hz.round() as i64)
    }
}

/// m:ss, non-finite or negative input reads as 0:00
pub fn format_time(sec: f64) -> String {
    if !sec.is_finite() {
        return "0:00".to_string();
    }
    let s = sec.max(0.0).floor() as u64;
    format!("{}:{:02}", s / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);

        // Degenerate edges must not divide by zero
        assert_eq!(smoothstep(0.3, 0.3, 0.5), 1.0);
    }

    #[test]
    fn test_log_space_endpoints() {
        let v = log_space(18.0, 18000.0, 4);
        assert_eq!(v.len(), 4);
        assert!((v[0] - 18.0).abs() < 1e-3);
        assert!((v[3] - 18000.0).abs() < 1.0);
        assert!((v[1] - 180.0).abs() < 0.1); // one decade per step

        assert_eq!(log_space(10.0, 100.0, 1), vec![10.0]);
    }

    #[test]
    fn test_frame_fraction_at_60fps() {
        // One reference frame reproduces the raw fraction
        assert!((frame_fraction(0.12, 1.0 / 60.0) - 0.12).abs() < 1e-5);

        // Two frames' worth compounds
        let two = frame_fraction(0.12, 2.0 / 60.0);
        assert!((two - (1.0 - 0.88f32 * 0.88)).abs() < 1e-5);

        assert_eq!(frame_fraction(0.5, 0.0), 0.0);
    }

    #[test]
    fn test_rate_fraction_bounds() {
        assert_eq!(rate_fraction(18.0, 0.0), 0.0);
        let k = rate_fraction(18.0, 1.0 / 60.0);
        assert!((k - (1.0 - (-0.3f32).exp())).abs() < 1e-6);
        assert!(rate_fraction(1e9, 1.0) <= 1.0);
    }

    #[test]
    fn test_format_hz() {
        assert_eq!(format_hz(63.0), "63");
        assert_eq!(format_hz(1000.0), "1.0k");
        assert_eq!(format_hz(2000.0), "2.0k");
        assert_eq!(format_hz(16000.0), "16k");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
