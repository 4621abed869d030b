//! Background twinkle pixels, footstep dust and the horizon wave line.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use super::canvas::{Canvas, Ink};
use crate::envelope::Envelope;
use crate::math::{clamp, clamp01};
use crate::params::AmbientConfig;

/// One twinkling background pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BgPixel {
    pub x: f32,
    pub y: f32,

    /// Peak alpha
    pub alpha: f32,

    /// Square size (device px)
    pub size: f32,

    /// Twinkle speed (rad/s)
    pub speed: f32,
    pub phase: f32,
}

/// Dust kicked up by a footstep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,

    /// Velocity (device px/s)
    pub vel: Vec2,

    /// Remaining life (seconds)
    pub life: f32,
}

/// Per-frame drive for the ambient layers
#[derive(Debug, Clone, Copy, Default)]
pub struct AmbientDrive {
    pub dt: f32,
    pub t_now: f32,
    pub dpr: f32,
    pub bass: f32,
    pub mids: f32,
    pub air: f32,
    pub kick: f32,
    pub visibility: f32,
}

/// Footstep conditions, evaluated by the compositor
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDrive {
    pub playing: bool,
    pub motion: f32,
    pub phase: f32,
    pub grounded: bool,
    pub walker_x: f32,
    pub horizon: f32,
}

pub struct Ambient {
    config: AmbientConfig,
    rng: StdRng,
    pixels: Vec<BgPixel>,
    size: (u32, u32),
    particles: Vec<Particle>,
    wave: WaveLine,
}

impl Ambient {
    pub fn new(config: AmbientConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            pixels: Vec::new(),
            size: (0, 0),
            particles: Vec::new(),
            wave: WaveLine::default(),
        }
    }

    pub fn config(&self) -> &AmbientConfig {
        &self.config
    }

    pub fn pixels(&self) -> &[BgPixel] {
        &self.pixels
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn wave(&self) -> &WaveLine {
        &self.wave
    }

    /// Regenerate background pixels when the canvas size changes
    pub fn ensure(&mut self, w: u32, h: u32) -> bool {
        if self.size == (w, h) && !self.pixels.is_empty() {
            return false;
        }
        self.size = (w, h);
        let c = &self.config;
        let n = ((w as f32 * h as f32) / c.bg_area_per_pixel.max(1.0)).floor() as usize;
        let n = n.clamp(c.bg_min, c.bg_max.max(c.bg_min));

        let rng = &mut self.rng;
        self.pixels = (0..n)
            .map(|_| BgPixel {
                size: if rng.gen::<f32>() < 0.12 { 2.0 } else { 1.0 },
                x: (rng.gen::<f32>() * w as f32).floor(),
                y: (rng.gen::<f32>() * h as f32 * 0.86).floor(),
                alpha: 0.07 + rng.gen::<f32>() * 0.24,
                speed: 0.35 + rng.gen::<f32>() * 1.15,
                phase: rng.gen::<f32>() * TAU,
            })
            .collect();
        true
    }

    pub fn draw_background(&self, canvas: &mut dyn Canvas, drive: &AmbientDrive) {
        let base_a = 0.78 + 0.22 * clamp01(drive.visibility);
        for p in &self.pixels {
            let twinkle = 0.62 + 0.38 * (drive.t_now * p.speed + p.phase).sin();
            let a = clamp(p.alpha * twinkle * base_a, 0.0, 0.34);
            if a <= 0.001 {
                continue;
            }
            canvas.fill_rect(p.x, p.y, p.size, p.size, Ink::green(a).lighter());
        }
    }

    /// Spawn dust on a footfall, then integrate and prune. Returns the number
    /// of particles spawned this frame.
    pub fn update_particles(&mut self, drive: &AmbientDrive, step: &StepDrive) -> usize {
        let c = &self.config;
        let dpr = drive.dpr.max(0.1);
        let dt = drive.dt.max(0.0);
        let (bass, kick) = (drive.bass, drive.kick);

        let footfall = step.playing
            && step.motion > c.particle_motion_gate
            && step.phase.sin().abs() > 0.993
            && bass + kick > c.particle_energy_gate
            && step.grounded;

        let mut spawned = 0;
        if footfall {
            let origin = Vec2::new(step.walker_x + step.phase.sin() * 12.0 * dpr, step.horizon + dpr);
            for _ in 0..c.particles_per_step {
                let vx = (self.rng.gen::<f32>() - 0.5) * 32.0 * dpr * (0.55 + bass + kick);
                let vy = -(self.rng.gen::<f32>() * 62.0 * dpr * (0.5 + bass + kick * 0.8));
                self.particles.push(Particle {
                    pos: origin,
                    vel: Vec2::new(vx, vy),
                    life: 0.38 + self.rng.gen::<f32>() * 0.35,
                });
            }
            spawned = c.particles_per_step;
        }

        let gravity = c.particle_gravity_px * dpr;
        let bottom = self.size.1 as f32 + 40.0;
        for p in &mut self.particles {
            p.life -= dt;
            p.vel.y += gravity * dt;
            p.pos += p.vel * dt;
        }
        self.particles.retain(|p| p.life > 0.0 && p.pos.y <= bottom);
        spawned
    }

    pub fn draw_particles(&self, canvas: &mut dyn Canvas, drive: &AmbientDrive, motion: f32) {
        let size = (2.0 * drive.dpr).floor().max(1.0);
        let gain = (0.12 + drive.air * 0.2 + drive.kick * 0.1) * clamp01(motion);
        for p in &self.particles {
            let a = clamp01(p.life) * gain;
            if a > 0.001 {
                canvas.fill_rect(p.pos.x.floor(), p.pos.y.floor(), size, size, Ink::green(a));
            }
        }
    }

    pub fn update_wave(&mut self, drive: &AmbientDrive) {
        self.wave.update(drive);
    }

    pub fn draw_wave(&self, canvas: &mut dyn Canvas, drive: &AmbientDrive, horizon: f32) {
        self.wave.draw(canvas, drive, horizon);
    }
}

/// Two-oscillator line hovering over the horizon; speed, amplitude and
/// alpha follow mids and kick.
#[derive(Debug, Clone)]
pub struct WaveLine {
    speed: Envelope,
    amp: Envelope,
    alpha: Envelope,
    phase: f32,
}

impl Default for WaveLine {
    fn default() -> Self {
        Self {
            speed: Envelope::per_reference_frame(0.05, 0.05).with_value(0.42),
            amp: Envelope::per_reference_frame(0.06, 0.06).with_value(7.0),
            alpha: Envelope::per_reference_frame(0.05, 0.05).with_value(0.055),
            phase: 0.0,
        }
    }
}

impl WaveLine {
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn amplitude(&self) -> f32 {
        self.amp.value
    }

    pub fn alpha(&self) -> f32 {
        self.alpha.value
    }

    pub fn update(&mut self, drive: &AmbientDrive) {
        let dt = drive.dt.max(0.0);
        let (mids, kick) = (clamp01(drive.mids), clamp01(drive.kick));
        let speed = self.speed.update(0.42 + mids * 0.18 + kick * 0.08, dt);
        self.amp.update((7.0 + mids * 7.5 + kick * 4.0) * drive.dpr.max(0.1), dt);
        self.alpha.update(clamp(0.055 + mids * 0.11 + kick * 0.07, 0.045, 0.24), dt);
        self.phase += dt * speed * 1.7;
    }

    /// Wave height at `x` (device px above the baseline)
    pub fn height_at(&self, x: f32) -> f32 {
        let osc1 = 0.5 + 0.5 * (x * 0.0105 + self.phase).sin();
        let osc2 = 0.5 + 0.5 * (x * 0.021 + self.phase * 1.1).sin();
        (osc1 * 0.82 + osc2 * 0.18) * self.amp.value
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, drive: &AmbientDrive, horizon: f32) {
        let dpr = drive.dpr.max(0.1);
        let base = horizon - 9.0 * dpr;
        let step = (6.0 * dpr).floor().max(2.0) as usize;
        let w = canvas.width();

        let points: Vec<Vec2> = (0..=w as usize)
            .step_by(step)
            .map(|x| Vec2::new(x as f32, base - self.height_at(x as f32)))
            .collect();
        let width = ((1.0 + drive.mids * 0.35 + drive.kick * 0.2) * dpr).floor().max(1.0);
        canvas.stroke_polyline(&points, width, Ink::green(self.alpha.value).lighter());
    }
}
