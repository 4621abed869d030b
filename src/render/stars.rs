//! Column-bound stars: a breathing core per star plus expanding pulse rings.
//!
//! Each star listens to one spectrum column. Its core follows the smoothed
//! column level; rings are spawned by sustained input ("flow") or by beats,
//! rate-limited by a per-star cooldown and capped at `pulse_max` live rings.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::canvas::{Canvas, Ink};
use crate::math::{clamp, clamp01, lerp};
use crate::params::StarConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Star {
    /// Position (device px)
    pub base: Vec2,

    /// Spectrum column this star listens to
    pub col: usize,

    /// Frequency inside the column's band (Hz)
    pub hz: f32,

    /// Analyser bin for `hz`, resolved once a sample rate is known
    pub bin: Option<usize>,

    /// Core radius (CSS px)
    pub base_r: f32,

    /// Breathing phase offset
    pub seed: f32,

    /// Smoothed input level
    pub core: f32,

    /// Ring ages in [0, 1), newest first
    pub pulses: Vec<f32>,

    /// Flow accumulator; a ring is due each time it passes 1
    pub pulse_phase: f32,

    /// Seconds until another ring may spawn
    pub cooldown: f32,
}

/// Per-frame drive shared by [`StarField::update`] and [`StarField::draw`]
#[derive(Debug, Clone, Copy)]
pub struct StarDrive<'a> {
    pub dt: f32,
    pub t_now: f32,
    pub dpr: f32,

    pub bass: f32,
    pub mids: f32,
    pub air: f32,
    pub kick: f32,

    pub beat: bool,
    pub impulse: f32,
    pub beat_count: u64,

    /// Scene visibility in [0, 1]
    pub visibility: f32,

    /// Audio is connected and producing frames
    pub live: bool,

    /// Smoothed per-column levels; empty when unavailable
    pub star_bands: &'a [f32],

    /// Raw frequency bytes, used when `star_bands` is empty
    pub freq: Option<&'a [u8]>,
}

pub struct StarField {
    config: StarConfig,
    stars: Vec<Star>,
    size: (u32, u32),
    rng: StdRng,
}

impl StarField {
    pub fn new(config: StarConfig, seed: u64) -> Self {
        Self {
            config,
            stars: Vec::new(),
            size: (0, 0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    /// Number of stars for a canvas of `w`×`h` device pixels
    pub fn star_count(&self, w: u32, h: u32) -> usize {
        let n = (w as f32 * h as f32 / self.config.area_per_star.max(1.0)).floor() as usize;
        n.clamp(self.config.count_min, self.config.count_max.max(self.config.count_min))
    }

    /// Scatter stars over the canvas when its size changes. `edges` are the
    /// column edges (Hz). Returns true when the field was rebuilt.
    pub fn ensure(&mut self, w: u32, h: u32, edges: &[f32]) -> bool {
        if self.size == (w, h) && !self.stars.is_empty() {
            return false;
        }
        self.size = (w, h);
        let columns = edges.len().saturating_sub(1).max(1);
        let n = self.star_count(w, h);
        let (wf, hf) = (w as f32, h as f32);

        let mut cols: Vec<usize> = (0..columns).collect();
        cols.shuffle(&mut self.rng);

        let cfg = &self.config;
        let rng = &mut self.rng;
        self.stars = (0..n)
            .map(|i| {
                let col = cols.get(i).copied().unwrap_or_else(|| rng.gen_range(0..columns));
                let slot = wf / columns as f32;
                let x_base = (col as f32 + 0.5) * slot;
                let x_jit = (rng.gen::<f32>() - 0.5) * slot * 0.8;
                let x = (x_base + x_jit).min(wf - 10.0).max(10.0_f32.min(wf * 0.5));
                let y = rng.gen::<f32>() * hf * 0.56 + hf * 0.08;

                let hz0 = edges.get(col).copied().unwrap_or(0.0);
                let hz1 = edges.get(col + 1).copied().unwrap_or(hz0 + 1.0);
                Star {
                    base: Vec2::new(x, y),
                    col,
                    hz: hz0 + rng.gen::<f32>() * (hz1 - hz0),
                    bin: None,
                    base_r: cfg.core_r_base + rng.gen::<f32>() * cfg.core_r_jitter,
                    seed: rng.gen::<f32>() * 1000.0,
                    core: 0.0,
                    pulses: Vec::with_capacity(cfg.pulse_max + 1),
                    pulse_phase: rng.gen::<f32>(),
                    cooldown: rng.gen::<f32>() * cfg.pulse_cooldown_s,
                }
            })
            .collect();

        tracing::debug!(stars = self.stars.len(), w, h, "star field rebuilt");
        true
    }

    /// Resolve each star's analyser bin
    pub fn assign_bins(&mut self, sample_rate: u32, bin_count: usize) {
        if sample_rate == 0 || bin_count == 0 {
            return;
        }
        let nyquist = sample_rate as f32 * 0.5;
        for star in self.stars.iter_mut().filter(|s| s.bin.is_none()) {
            let bin = (star.hz / nyquist * bin_count as f32).floor().max(0.0) as usize;
            star.bin = Some(bin.min(bin_count - 1));
        }
    }

    fn star_input(star: &Star, drive: &StarDrive) -> f32 {
        if !drive.live {
            return 0.0;
        }
        if !drive.star_bands.is_empty() {
            return drive.star_bands.get(star.col).copied().unwrap_or(0.0);
        }
        match (drive.freq, star.bin) {
            (Some(freq), Some(bin)) => freq.get(bin).copied().unwrap_or(0) as f32 / 255.0,
            _ => 0.0,
        }
    }

    /// Advance cores, ring ages and spawning
    pub fn update(&mut self, drive: &StarDrive) {
        let cfg = &self.config;
        let dt = drive.dt.max(0.0);
        let kick = clamp01(drive.kick);
        let impulse = clamp01(drive.impulse);
        let pulse_speed = cfg.pulse_speed + drive.bass * 0.08 + kick * 0.1;
        let scene_v = clamp01(drive.visibility);

        let n = self.stars.len().max(1) as u64;
        let forced = drive
            .beat
            .then(|| ((drive.beat_count % n) as usize, ((drive.beat_count * 7) % n) as usize));

        for (i, star) in self.stars.iter_mut().enumerate() {
            let input = clamp01(Self::star_input(star, drive) * cfg.gain);
            let k = if input > star.core {
                cfg.core_attack
            } else {
                cfg.core_release
            };
            star.core += (input - star.core) * k;
            star.cooldown = (star.cooldown - dt).max(0.0);

            for age in &mut star.pulses {
                *age += dt * pulse_speed;
            }
            star.pulses.retain(|&age| age < 1.0);

            if scene_v > 0.06 {
                let low_weight = clamp01(1.0 - (star.hz - 70.0) / 1200.0);
                let chance = (0.06 + 0.22 * low_weight)
                    * (0.45 + 0.55 * scene_v)
                    * (0.65 + 0.85 * impulse);
                let force_this = forced.is_some_and(|(a, b)| i == a || i == b);

                let rate = cfg.pulse_rate_min + cfg.pulse_rate_gain * input + cfg.pulse_rate_kick_gain * kick;
                star.pulse_phase += dt * rate;

                let want_flow = input > cfg.pulse_gate && star.pulse_phase >= 1.0;
                let want_beat = drive.beat
                    && input > cfg.beat_gate
                    && (force_this || self.rng.gen::<f32>() < chance);

                if star.cooldown <= 0.0 && (want_flow || want_beat) {
                    star.pulses.insert(0, 0.0);
                    star.cooldown = cfg.pulse_cooldown_s * (0.75 + self.rng.gen::<f32>() * 0.45);
                    if want_flow {
                        star.pulse_phase -= 1.0;
                    }
                    star.pulses.truncate(cfg.pulse_max);
                }
            } else {
                star.pulse_phase += dt * cfg.pulse_rate_min * 0.25;
            }
        }
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, drive: &StarDrive) {
        let cfg = &self.config;
        let dpr = drive.dpr.max(0.1);
        let kick = clamp01(drive.kick);
        let impulse = clamp01(drive.impulse);
        let vis = clamp01(0.22 + 0.78 * clamp01(drive.visibility));
        let thin = (1.0 * dpr).floor().max(1.0);

        for star in &self.stars {
            let breath = 0.97 + 0.03 * (drive.t_now * cfg.breath_speed + star.seed * 0.25).sin();
            let c = star.base;
            let r_core = star.base_r * dpr;

            let core_a = (cfg.core_alpha_base + star.core * (cfg.core_alpha_max - cfg.core_alpha_base))
                * breath
                * (1.0 + impulse * 0.28);
            let core_a = clamp(core_a * vis, 0.0, 0.98);
            if core_a <= 0.002 {
                continue;
            }

            let halo_a = clamp(core_a * (0.2 + drive.air * 0.22 + impulse * 0.12), 0.0, 0.34);
            canvas.stroke_circle(c, r_core * 2.25, (1.2 * dpr).floor().max(1.0), Ink::green(halo_a));
            canvas.fill_circle(c, r_core, Ink::green(core_a));
            canvas.stroke_circle(c, r_core * 1.06, thin, Ink::green((core_a * 0.62).min(0.7)));
            canvas.fill_circle(
                c + Vec2::new(-r_core * 0.12, -r_core * 0.14),
                r_core * 0.44,
                Ink::green((core_a * 0.22).min(0.24)),
            );

            // Additive sparkle and rings
            let sparkle = clamp(0.35 + star.core * 1.15 + kick * 0.85 + impulse * 1.15, 0.0, 2.8);
            let spike = r_core * (1.55 + sparkle * 0.85);
            let spike_ink = Ink::green(clamp(core_a * (0.12 + sparkle * 0.11), 0.0, 0.48)).lighter();
            if !spike_ink.is_invisible() {
                canvas.stroke_line(c - Vec2::X * spike, c + Vec2::X * spike, thin, spike_ink);
                canvas.stroke_line(c - Vec2::Y * spike, c + Vec2::Y * spike, thin, spike_ink);
            }

            let amp = (0.18 + 0.82 * star.core) * (0.42 + 0.58 * kick) * (0.75 + 0.85 * impulse);
            for &p in &star.pulses {
                let fade = (1.0 - p).max(0.0).powf(1.85);
                let rr = r_core * 1.12 + lerp(cfg.ring_r_min, cfg.ring_r_max, p) * dpr;
                let thick = lerp(cfg.ring_thick_max, cfg.ring_thick_min, p) * dpr;
                let ring_a = clamp(
                    (cfg.ring_alpha_base + cfg.ring_alpha_gain * amp)
                        * fade
                        * (0.9 + 0.1 * drive.mids)
                        * vis,
                    0.0,
                    0.92,
                );
                if ring_a <= 0.001 {
                    continue;
                }
                canvas.stroke_circle(c, rr, thick.max(1.0), Ink::green(ring_a).lighter());
                canvas.stroke_circle(c, rr, (thick * 2.1).max(1.0), Ink::green(ring_a * 0.22).lighter());
            }
        }
    }
}
