//! Scene canvas: background, stars, ground, wave, walker and dust, in that order.

use glam::Vec2;

use super::ambient::{Ambient, AmbientDrive, StepDrive};
use super::canvas::{Canvas, Ink};
use super::rig::{draw_walker, solve_pose, RigInput, RigParams, WalkerPose, WalkerStyle};
use super::stars::{StarDrive, StarField};
use crate::audio::{BeatFrame, FrameFeatures};
use crate::params::{AmbientConfig, StarConfig, WalkerConfig};
use crate::scene::SceneFrame;

/// Everything the scene needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct SceneInputs<'a> {
    pub features: &'a FrameFeatures,
    pub beat: &'a BeatFrame,
    pub scene: &'a SceneFrame,

    /// Raw analyser bytes and their sample rate, when audio is connected
    pub freq: Option<&'a [u8]>,
    pub sample_rate: u32,

    pub playing: bool,
    pub dt: f32,
    pub t_now: f32,
    pub dpr: f32,
}

pub struct SceneRenderer {
    stars: StarField,
    ambient: Ambient,
    rig: RigParams,
    last_pose: WalkerPose,
}

impl SceneRenderer {
    pub fn new(stars: StarConfig, ambient: AmbientConfig, walker: &WalkerConfig, seed: u64) -> Self {
        Self {
            stars: StarField::new(stars, seed),
            ambient: Ambient::new(ambient, seed.wrapping_add(1)),
            rig: RigParams::from_walker(walker),
            last_pose: WalkerPose::default(),
        }
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn ambient(&self) -> &Ambient {
        &self.ambient
    }

    /// Pose drawn on the last frame
    pub fn last_pose(&self) -> &WalkerPose {
        &self.last_pose
    }

    /// Rebuild size-dependent layers after a resize
    pub fn ensure(&mut self, w: u32, h: u32, edges: &[f32]) {
        self.stars.ensure(w, h, edges);
        self.ambient.ensure(w, h);
    }

    pub fn draw(&mut self, canvas: &mut dyn Canvas, edges: &[f32], input: &SceneInputs) {
        let (wi, hi) = (canvas.width(), canvas.height());
        let (w, h) = (wi as f32, hi as f32);
        let dpr = input.dpr.max(0.1);
        let features = input.features;
        let bands = features.bands;
        let beat = input.beat;
        let scene = input.scene;

        self.ensure(wi, hi, edges);

        canvas.clear();
        canvas.fill_rect(0.0, 0.0, w, h, Ink::black(0.14));

        let amb = AmbientDrive {
            dt: input.dt,
            t_now: input.t_now,
            dpr,
            bass: bands.bass,
            mids: bands.mids,
            air: bands.air,
            kick: beat.kick,
            visibility: scene.visibility,
        };
        self.ambient.draw_background(canvas, &amb);

        if let Some(freq) = input.freq {
            self.stars.assign_bins(input.sample_rate, freq.len());
        }
        let star_drive = StarDrive {
            dt: input.dt,
            t_now: input.t_now,
            dpr,
            bass: bands.bass,
            mids: bands.mids,
            air: bands.air,
            kick: beat.kick,
            beat: beat.beat,
            impulse: beat.impulse,
            beat_count: beat.count,
            visibility: scene.visibility,
            live: features.live,
            star_bands: &features.star_bands,
            freq: input.freq,
        };
        self.stars.update(&star_drive);
        self.stars.draw(canvas, &star_drive);

        let scan = Ink::green(self.ambient.config().scan_alpha * 0.55);
        let step = (4.0 * dpr).floor().max(2.0) as usize;
        for y in (0..hi as usize).step_by(step) {
            canvas.fill_rect(0.0, y as f32, w, 1.0, scan);
        }

        canvas.stroke_line(
            Vec2::new(0.0, h - 0.5),
            Vec2::new(w, h - 0.5),
            dpr.floor().max(1.0),
            Ink::green(0.14 + bands.bass * 0.22 + beat.kick * 0.12),
        );

        self.ambient.update_wave(&amb);
        self.ambient.draw_wave(canvas, &amb, scene.horizon);

        let pose = solve_pose(
            &RigInput {
                x: scene.walker_x,
                foot_y: scene.foot_y,
                ground_y: scene.horizon,
                scale: 1.0,
                dpr,
                phase: scene.phase,
                t_now: input.t_now,
                motion: scene.motion,
                bass: bands.bass,
                mids: bands.mids,
                air: bands.air,
                kick: beat.kick,
                body_yaw: scene.body_yaw,
                look_yaw: scene.look_yaw,
                look_pitch: scene.look_pitch,
                walk_dir: scene.dir,
                hang: scene.hang,
                pull: scene.pull,
                playing: input.playing,
                crouch: 0.0,
            },
            &self.rig,
        );
        draw_walker(canvas, &pose, &WalkerStyle::with_alpha(scene.walker_alpha));
        self.last_pose = pose;

        self.ambient.update_particles(
            &amb,
            &StepDrive {
                playing: input.playing,
                motion: scene.motion,
                phase: scene.phase,
                grounded: scene.grounded,
                walker_x: scene.walker_x,
                horizon: scene.horizon,
            },
        );
        self.ambient.draw_particles(canvas, &amb, scene.motion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawOp, RecordingCanvas};

    fn edges() -> Vec<f32> {
        crate::math::log_space(18.0, 18000.0, 41)
    }

    #[test]
    fn test_scene_draw_order() {
        let mut renderer = SceneRenderer::new(
            StarConfig::default(),
            AmbientConfig::default(),
            &WalkerConfig::default(),
            42,
        );
        let features = FrameFeatures {
            columns: vec![0.5; 40],
            star_bands: vec![0.5; 40],
            live: true,
            ..Default::default()
        };
        let beat = BeatFrame::default();
        let scene = SceneFrame {
            visibility: 0.8,
            motion: 0.6,
            walker_x: 300.0,
            walker_alpha: 0.7,
            horizon: 478.0,
            foot_y: 478.0,
            grounded: true,
            dir: 1.0,
            ..Default::default()
        };
        let mut canvas = RecordingCanvas::new(960, 480);
        renderer.draw(
            &mut canvas,
            &edges(),
            &SceneInputs {
                features: &features,
                beat: &beat,
                scene: &scene,
                freq: None,
                sample_rate: 48000,
                playing: true,
                dt: 1.0 / 60.0,
                t_now: 1.0,
                dpr: 1.0,
            },
        );

        assert_eq!(canvas.ops[0], DrawOp::Clear);
        assert!(matches!(canvas.ops[1], DrawOp::FillRect { ink, .. } if ink.rgb == [0, 0, 0]));
        assert_eq!(renderer.stars().stars().len(), 12);
        assert_eq!(renderer.ambient().pixels().len(), 220);

        // The walker's head ring comes after the wave line
        let wave = canvas
            .ops
            .iter()
            .position(|op| matches!(op, DrawOp::Polyline { points, .. } if points.len() > 100))
            .unwrap();
        let head = canvas
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::StrokeCircle { r, .. } if (*r - 12.0).abs() < 1e-3))
            .unwrap();
        assert!(head > wave);
        assert!((renderer.last_pose().head_r - 12.0).abs() < 1e-6);
    }
}
