//! Still walker: the rig posed by hand and exported as a PNG logo.
//!
//! Uses the same solver and painter as the live walker. Proportions come from
//! [`RigParams`] multipliers, the pose from a [`PosePreset`] plus explicit
//! overrides, and a seeded jitter nudges the figure off-centre.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::canvas::{Canvas, Ink, PixmapCanvas};
use super::rig::{draw_walker, solve_pose, RigInput, RigLines, RigParams, WalkerPose, WalkerStyle};
use crate::error::EngineError;
use crate::math::{clamp, clamp01};
use crate::params::StillConfig;

/// Export supersampling factor
pub const EXPORT_DPR: f32 = 2.0;

/// Canonical viewing angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PosePreset {
    Front,
    #[default]
    ThreeQuarter,
    Side,
}

impl PosePreset {
    /// (body yaw, look yaw, look pitch)
    pub fn angles(self) -> (f32, f32, f32) {
        match self {
            PosePreset::Front => (0.0, 0.0, -0.06),
            PosePreset::ThreeQuarter => (0.55, 0.35, -0.08),
            PosePreset::Side => (0.92, 0.55, -0.06),
        }
    }
}

/// Everything that defines a still
#[derive(Debug, Clone, PartialEq)]
pub struct StillParams {
    pub seed: u64,

    /// Rig unit per 420 px of the shorter canvas side
    pub scale: f32,

    /// Centre offset as a fraction of the shorter side (x, y)
    pub offset: (f32, f32),

    /// Placement jitter in [0, 0.35]
    pub jitter: f32,

    pub body_yaw: f32,
    pub look_yaw: f32,
    pub look_pitch: f32,

    pub motion: f32,
    pub phase: f32,
    pub walk_dir: f32,

    pub crouch: f32,
    pub hang: f32,
    pub pull: f32,

    pub bass: f32,
    pub mids: f32,
    pub air: f32,
    pub kick: f32,

    pub line_alpha: f32,
    pub glow: f32,

    /// Stroke width before scaling (CSS px)
    pub line_width: f32,
    pub glass: f32,
    pub visor_fill: f32,

    /// Backdrop opacity when not transparent
    pub bg_alpha: f32,
    pub transparent: bool,

    pub rig: RigParams,
    pub lines: RigLines,
}

impl Default for StillParams {
    fn default() -> Self {
        Self::with_preset(PosePreset::default())
    }
}

impl StillParams {
    pub fn with_preset(preset: PosePreset) -> Self {
        Self::from_config(preset, &StillConfig::default())
    }

    /// Preset angles, overridden by whatever `config` sets
    pub fn from_config(preset: PosePreset, config: &StillConfig) -> Self {
        let (body_yaw, look_yaw, look_pitch) = preset.angles();
        Self {
            seed: 0,
            scale: config.scale,
            offset: (config.offset_x, config.offset_y),
            jitter: config.jitter,
            body_yaw: config.body_yaw.unwrap_or(body_yaw),
            look_yaw: config.look_yaw.unwrap_or(look_yaw),
            look_pitch: config.look_pitch.unwrap_or(look_pitch),
            motion: config.motion,
            phase: config.phase,
            walk_dir: config.walk_dir,
            crouch: config.crouch,
            hang: config.hang,
            pull: config.pull,
            bass: 0.35,
            mids: 0.35,
            air: 0.25,
            kick: 0.22,
            line_alpha: 0.95,
            glow: 0.55,
            line_width: 1.35,
            glass: 0.68,
            visor_fill: 0.24,
            bg_alpha: 0.22,
            transparent: true,
            rig: RigParams {
                head: config.head,
                body: config.body,
                arm: config.arm,
                leg: config.leg,
                shoulders: config.shoulders,
                hips: config.hips,
                visor_w: config.visor_w,
                visor_h: config.visor_h,
                pack: config.pack,
                motion_amp: config.motion_amp,
                idle_stride: 0.0,
                idle_bob_px: 0.0,
                idle_sway_px: 0.0,
            },
            lines: RigLines {
                glow: true,
                ground: true,
                ..Default::default()
            },
        }
    }

    /// Solve and frame the pose for a `w`×`h` canvas
    pub fn pose(&self, w: f32, h: f32) -> (WalkerPose, WalkerStyle) {
        let base = w.min(h).max(1.0);
        let px = base / 420.0;
        let s = px * self.scale;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let j = clamp(self.jitter, 0.0, 0.35);
        let jx = (rng.gen::<f32>() - 0.5) * s * 0.65 * j;
        let jy = (rng.gen::<f32>() - 0.5) * s * 0.55 * j;

        let x = w * 0.5 + jx + self.offset.0 * base * 0.35;
        let foot_y = h * 0.82 + jy + self.offset.1 * base * 0.35;

        let mut pose = solve_pose(
            &RigInput {
                x,
                foot_y,
                ground_y: foot_y,
                scale: self.scale,
                dpr: px,
                phase: self.phase,
                t_now: 0.0,
                motion: self.motion,
                bass: self.bass,
                mids: self.mids,
                air: self.air,
                kick: self.kick,
                body_yaw: self.body_yaw,
                look_yaw: self.look_yaw,
                look_pitch: self.look_pitch,
                walk_dir: self.walk_dir,
                hang: self.hang,
                pull: self.pull,
                playing: true,
                crouch: self.crouch,
            },
            &self.rig,
        );

        let lw = (self.line_width * px * (0.85 + 0.55 * self.scale.max(0.1).sqrt())).max(1.0);

        // Keep the figure inside a margin
        let margin = base * 0.06;
        let min_y = pose.head.y - pose.head_r - lw * 2.0;
        let max_y = pose.foot_y + lw * 2.0 + 0.35 * s;
        let mut dy = 0.0;
        if min_y < margin {
            dy = margin - min_y;
        }
        if max_y + dy > h - margin {
            dy -= max_y + dy - (h - margin);
        }
        pose.translate_y(dy);

        let style = WalkerStyle {
            alpha: clamp(self.line_alpha, 0.06, 1.0),
            line_width: Some(lw),
            glow: clamp01(self.glow),
            glass: self.glass.max(0.0),
            visor_fill: self.visor_fill.max(0.0),
            ground_half_width: 0.45 * base,
            lines: self.lines,
        };
        (pose, style)
    }

    pub fn draw(&self, canvas: &mut dyn Canvas) {
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        canvas.clear();
        if !self.transparent {
            canvas.fill_rect(0.0, 0.0, w, h, Ink::black(self.bg_alpha));
        }
        let (pose, style) = self.pose(w, h);
        draw_walker(canvas, &pose, &style);
    }
}

/// Render a square still of `size` CSS px at [`EXPORT_DPR`]
pub fn render_still(params: &StillParams, size: u32) -> Result<PixmapCanvas, EngineError> {
    let px = (size.max(1) as f32 * EXPORT_DPR).floor() as u32;
    let mut canvas = PixmapCanvas::new(px, px)?;
    params.draw(&mut canvas);
    Ok(canvas)
}

/// Render and write a PNG
pub fn export_png(params: &StillParams, size: u32, path: &Path) -> Result<(), EngineError> {
    let canvas = render_still(params, size)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    canvas.to_image().save(path)?;
    tracing::info!("Wrote {}x{} still to {}", canvas.width(), canvas.height(), path.display());
    Ok(())
}
