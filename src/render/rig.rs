//! Procedural walker rig: a pure pose solver plus a painter.
//!
//! [`solve_pose`] turns the per-frame drive (gait phase, band energies, gaze,
//! scrub hang) into joint positions. [`draw_walker`] paints a solved pose.
//! Both the live walker and the still exporter go through the same pair.
//!
//! Units: every length is device pixels. `s = scale * dpr` is the rig unit;
//! body proportions are multiples of it, gait amplitudes are multiples of `dpr`.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;

use super::canvas::{Blend, Canvas, Ink, RadialGlow, PHOSPHOR};
use crate::math::{clamp, clamp01, finite_or, lerp, smoothstep};
use crate::params::WalkerConfig;

/// Body and head yaw limit (normalized turn)
pub const YAW_LIMIT: f32 = 0.95;

/// Head pitch limit (normalized tilt)
pub const PITCH_LIMIT: f32 = 0.55;

/// Separation passes in the leg solver
pub const LEG_SOLVE_PASSES: usize = 4;

/// Per-frame drive for the rig
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigInput {
    /// Walker centre line (device px)
    pub x: f32,

    /// Rest foot line, lifted while scrubbing (device px)
    pub foot_y: f32,

    /// Ground line the feet reach for while hanging (device px)
    pub ground_y: f32,

    /// Rig scale before DPR
    pub scale: f32,
    pub dpr: f32,

    /// Gait phase (radians)
    pub phase: f32,

    /// Wall clock for the idle bob (seconds)
    pub t_now: f32,

    /// Walk intensity in [0, 1]
    pub motion: f32,

    pub bass: f32,
    pub mids: f32,
    pub air: f32,
    pub kick: f32,

    /// Body turn in [-0.95, 0.95]; 0 faces the viewer, ±1 is profile
    pub body_yaw: f32,
    pub look_yaw: f32,
    pub look_pitch: f32,

    /// Travel direction, ±1
    pub walk_dir: f32,

    /// Scrub lift in [0, 1]
    pub hang: f32,

    /// Scrub drag direction in [-1, 1]
    pub pull: f32,

    /// Keeps a small idle stride while paused at zero motion
    pub playing: bool,

    /// Crouch in [0, 1]
    pub crouch: f32,
}

impl Default for RigInput {
    fn default() -> Self {
        Self {
            x: 0.0,
            foot_y: 0.0,
            ground_y: 0.0,
            scale: 1.0,
            dpr: 1.0,
            phase: 0.0,
            t_now: 0.0,
            motion: 0.0,
            bass: 0.0,
            mids: 0.0,
            air: 0.0,
            kick: 0.0,
            body_yaw: 0.0,
            look_yaw: 0.0,
            look_pitch: 0.0,
            walk_dir: 1.0,
            hang: 0.0,
            pull: 0.0,
            playing: false,
            crouch: 0.0,
        }
    }
}

/// Proportion multipliers (1.0 = stock rig) and gait amplitudes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigParams {
    pub head: f32,
    pub body: f32,
    pub arm: f32,
    pub leg: f32,
    pub shoulders: f32,
    pub hips: f32,
    pub visor_w: f32,
    pub visor_h: f32,
    pub pack: f32,

    /// Multiplier on bounce, sway and shimmy
    pub motion_amp: f32,

    /// Stride kept while playing at zero motion
    pub idle_stride: f32,

    /// Idle bob amplitude (CSS px)
    pub idle_bob_px: f32,

    /// Idle sway amplitude (CSS px)
    pub idle_sway_px: f32,
}

impl Default for RigParams {
    fn default() -> Self {
        Self {
            head: 1.0,
            body: 1.0,
            arm: 1.0,
            leg: 1.0,
            shoulders: 1.0,
            hips: 1.0,
            visor_w: 1.0,
            visor_h: 1.0,
            pack: 1.0,
            motion_amp: 1.0,
            idle_stride: 0.28,
            idle_bob_px: 0.95,
            idle_sway_px: 0.55,
        }
    }
}

impl RigParams {
    /// Stock proportions with the walker's idle tuning
    pub fn from_walker(cfg: &WalkerConfig) -> Self {
        Self {
            idle_stride: cfg.idle_stride,
            idle_bob_px: cfg.idle_bob_px,
            idle_sway_px: cfg.idle_sway_px,
            ..Default::default()
        }
    }
}

/// A straight limb with an alpha multiplier
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArmPose {
    pub shoulder: Vec2,
    pub hand: Vec2,
    pub alpha: f32,
}

/// Hip, knee and foot of one leg
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LegPose {
    pub hip: Vec2,
    pub knee: Vec2,
    pub foot: Vec2,

    /// Swing lift in [0, 1]
    pub lift: f32,
    pub alpha: f32,
}

impl LegPose {
    /// Hip-to-foot distance
    pub fn length(&self) -> f32 {
        self.hip.distance(self.foot)
    }
}

/// Visor rectangle, narrowed as the head turns to profile
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VisorPose {
    pub center: Vec2,
    pub w: f32,
    pub h: f32,

    /// Profile edge line x, present once the head is turned enough
    pub edge_x: Option<f32>,
}

/// Solved joint positions for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WalkerPose {
    /// Rig unit (device px)
    pub s: f32,
    pub dpr: f32,

    /// Centre line and rest foot line the pose was solved for
    pub x: f32,
    pub foot_y: f32,

    /// 0 facing the viewer, 1 in profile
    pub side_t: f32,

    pub look_yaw: f32,
    pub look_pitch: f32,

    /// Band energies scaled by motion
    pub bass_m: f32,
    pub mids_m: f32,
    pub air_m: f32,
    pub kick_m: f32,

    /// Head centre before and after the gaze offset
    pub head_rest: Vec2,
    pub head: Vec2,
    pub head_r: f32,

    pub visor: VisorPose,

    pub torso_top: f32,
    pub torso_cx: f32,
    pub shoulder_y: f32,
    pub hip_y: f32,

    /// Left, right
    pub arms: [ArmPose; 2],

    /// Left (A), right (B)
    pub legs: [LegPose; 2],

    /// Indices into `legs`, far leg first
    pub leg_order: [usize; 2],

    pub min_leg: f32,
    pub max_leg: f32,
    pub min_sep: f32,

    /// Backpack rectangle (x, y, w, h)
    pub pack: [f32; 4],
}

impl WalkerPose {
    /// Shift every point vertically
    pub fn translate_y(&mut self, dy: f32) {
        let d = Vec2::new(0.0, dy);
        self.foot_y += dy;
        self.head_rest += d;
        self.head += d;
        self.visor.center += d;
        self.torso_top += dy;
        self.shoulder_y += dy;
        self.hip_y += dy;
        for arm in &mut self.arms {
            arm.shoulder += d;
            arm.hand += d;
        }
        for leg in &mut self.legs {
            leg.hip += d;
            leg.knee += d;
            leg.foot += d;
        }
        self.pack[1] += dy;
    }

    /// Horizontal gap between the feet (right minus left)
    pub fn foot_gap(&self) -> f32 {
        self.legs[1].foot.x - self.legs[0].foot.x
    }
}

/// Which parts to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigLines {
    pub glow: bool,
    pub head: bool,
    pub glass: bool,
    pub visor: bool,
    pub visor_fill: bool,
    pub arms: bool,
    pub legs: bool,
    pub backpack: bool,
    pub ground: bool,
}

impl Default for RigLines {
    fn default() -> Self {
        Self {
            glow: false,
            head: true,
            glass: true,
            visor: true,
            visor_fill: true,
            arms: true,
            legs: true,
            backpack: true,
            ground: false,
        }
    }
}

/// Paint parameters for [`draw_walker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkerStyle {
    /// Line opacity
    pub alpha: f32,

    /// Stroke width (device px); `None` derives it from the rig unit
    pub line_width: Option<f32>,

    /// Halo strength for the glow pass
    pub glow: f32,

    /// Glass highlight multiplier
    pub glass: f32,

    /// Visor fill multiplier
    pub visor_fill: f32,

    /// Half width of the ground line (device px)
    pub ground_half_width: f32,

    pub lines: RigLines,
}

impl Default for WalkerStyle {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            line_width: None,
            glow: 0.0,
            glass: 1.0,
            visor_fill: 1.0,
            ground_half_width: 0.0,
            lines: RigLines::default(),
        }
    }
}

impl WalkerStyle {
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            alpha,
            ..Default::default()
        }
    }
}

/// Solve the rig for one frame. Total: non-finite inputs read as 0 and every
/// input is clamped to its range.
pub fn solve_pose(input: &RigInput, rig: &RigParams) -> WalkerPose {
    let f = |v: f32| finite_or(v, 0.0);
    let dpr = finite_or(input.dpr, 1.0).max(0.1);
    let s = finite_or(input.scale, 1.0).max(0.01) * dpr;
    let x = f(input.x);
    let foot_y = f(input.foot_y);
    let ground_y = f(input.ground_y);
    let phase = f(input.phase);
    let t_now = f(input.t_now);

    let m = clamp01(f(input.motion));
    let idle = 1.0 - m;
    let crouch = clamp01(f(input.crouch));
    let hang = clamp01(f(input.hang));
    let pull = clamp(f(input.pull), -1.0, 1.0);
    let dir = if f(input.walk_dir) < 0.0 { -1.0 } else { 1.0 };
    let amp = finite_or(rig.motion_amp, 1.0).max(0.0);

    let body_yaw = clamp(f(input.body_yaw), -YAW_LIMIT, YAW_LIMIT);
    let yaw = clamp(f(input.look_yaw), -YAW_LIMIT, YAW_LIMIT);
    let pitch = clamp(f(input.look_pitch), -PITCH_LIMIT, PITCH_LIMIT);

    let side_t = smoothstep(0.18, 0.92, body_yaw.abs());
    let front_t = 1.0 - side_t;
    let face = side_t;

    let bass_m = clamp01(f(input.bass)) * m;
    let mids_m = clamp01(f(input.mids)) * m;
    let air_m = clamp01(f(input.air)) * m;
    let kick_m = clamp01(f(input.kick)) * m;

    let idle_gain = 0.35 + idle * 0.65;
    let idle_bob = (t_now * 1.22 + x * 0.003).sin() * (rig.idle_bob_px * dpr) * idle_gain;
    let idle_sway = (t_now * 0.85 + x * 0.0025).sin() * (rig.idle_sway_px * dpr) * idle_gain;

    let leg_len = 22.0 * s * rig.leg;
    let body_h = (26.0 - 6.0 * crouch) * s * rig.body;
    let head_r = 12.0 * s * rig.head;

    let bounce = (kick_m * 7.0 + bass_m * 3.2) * dpr * amp + idle_bob;
    let sway = (phase * 0.65).sin() * (2.3 * dpr + mids_m * 2.4 * dpr) * amp + idle_sway;
    let shimmy =
        (phase * 1.8 + (phase * 0.7).cos()).sin() * (1.2 * dpr + air_m * 1.8 * dpr) * amp;

    let hip_y = foot_y - leg_len - bounce * 0.35
        + (phase * 2.0).sin() * (2.0 * dpr + bass_m * 3.2 * dpr) * amp
        + crouch * 2.15 * s;
    let torso_top = hip_y - body_h - bounce * 0.25;
    let tug = pull * hang * 6.5 * dpr;

    // Head
    let head_rest = Vec2::new(
        x + sway * 0.6 + shimmy * 0.25 + tug,
        torso_top - head_r * 0.35 - bounce * 0.15
            + (phase * 1.15).sin() * (0.85 * dpr + air_m * 1.25 * dpr) * amp,
    );
    let head = head_rest + Vec2::new(yaw * head_r * 0.12, pitch * head_r * 0.32);

    // Visor
    let visor_w = 12.0 * s * rig.visor_w;
    let visor_h = 7.0 * s * rig.visor_h;
    let visor_center = head + Vec2::new(yaw * head_r * 0.38, pitch * head_r * 0.18);
    let vw = (visor_w * (1.0 - face * 0.82)).max(dpr);
    let vh = visor_h * (1.0 - face * 0.1);
    let edge_x = (face > 0.18)
        .then(|| visor_center.x + vw * 0.5 * if yaw < 0.0 { -1.0 } else { 1.0 });

    // Arms
    let torso_cx = x + sway * 0.35 + tug * 0.75;
    let shoulder_y = lerp(torso_top, hip_y, 0.42) - bounce * 0.12;
    let shoulder_cx = torso_cx + yaw * head_r * 0.1;
    let spread = 6.4 * s * (1.0 - face * 0.55) * rig.shoulders;
    let sh_l = Vec2::new(shoulder_cx - spread, shoulder_y);
    let sh_r = Vec2::new(shoulder_cx + spread, shoulder_y);

    let arm_len = (18.0 + kick_m * 2.5) * s * (1.0 - 0.2 * crouch) * rig.arm;
    let base_down = FRAC_PI_2 + pitch * 0.12 - hang * 0.6;
    let outward = 0.28 + mids_m * 0.12;
    let lift_amp = (0.18 + air_m * 0.14 + kick_m * 0.2) * m;
    let theta_l = clamp(
        base_down + outward + (phase + 0.9).sin() * lift_amp,
        base_down + 0.12,
        base_down + 0.85,
    );
    let theta_r = clamp(
        base_down - outward + (phase + 0.9 + PI).sin() * lift_amp,
        base_down - 0.85,
        base_down - 0.12,
    );
    let far_a = lerp(1.0, 0.62, side_t);
    let right_near = body_yaw >= 0.0;
    let hand_wobble = 0.55 * dpr * m;
    let arms = [
        ArmPose {
            shoulder: sh_l,
            hand: sh_l
                + Vec2::new(
                    theta_l.cos() * arm_len + shimmy * 0.18,
                    theta_l.sin() * arm_len + (phase * 1.6).sin() * hand_wobble,
                ),
            alpha: 1.0,
        },
        ArmPose {
            shoulder: sh_r,
            hand: sh_r
                + Vec2::new(
                    theta_r.cos() * arm_len - shimmy * 0.18,
                    theta_r.sin() * arm_len + (phase * 1.6).cos() * hand_wobble,
                ),
            alpha: if right_near { 1.0 } else { far_a },
        },
    ];

    // Legs
    let idle_stride = if input.playing { rig.idle_stride } else { 0.0 };
    let stride_amp = lerp(idle_stride, 1.0, m);
    let swing_fwd_raw = -phase.sin() * dir;
    let swing = swing_fwd_raw * stride_amp;

    let hip_spread = 4.3 * s * lerp(1.0, 0.42, side_t) * rig.hips;
    let hip_l = Vec2::new(torso_cx - hip_spread, hip_y);
    let hip_r = Vec2::new(torso_cx + hip_spread, hip_y);

    let step = swing * ((11.6 + kick_m * 4.2) * s * side_t + (5.8 + kick_m * 2.2) * s * front_t);
    let reach_y = lerp(foot_y, ground_y, hang);
    let hang_damp = 1.0 - hang * 0.9;

    let lift_a = smoothstep(0.0, 1.0, swing_fwd_raw.max(0.0));
    let lift_b = smoothstep(0.0, 1.0, (-swing_fwd_raw).max(0.0));
    let lift_px = (7.2 + kick_m * 5.0 + mids_m * 2.0)
        * s
        * (0.45 + 0.55 * front_t)
        * hang_damp
        * stride_amp
        * (1.0 - 0.28 * crouch);
    let foot_floor = ground_y + 2.2 * dpr;

    let foot_a = Vec2::new(
        hip_l.x + step + sway * 0.18,
        (reach_y - lift_a * lift_px).min(foot_floor),
    );
    let foot_b = Vec2::new(
        hip_r.x - step - sway * 0.18,
        (reach_y - lift_b * lift_px).min(foot_floor),
    );

    let max_leg = leg_len * lerp(1.08, 1.16, m);
    let min_leg = leg_len * lerp(0.74, 0.62, m);
    let min_sep = lerp(11.0, 6.0, side_t) * s;
    let [foot_a, foot_b] = solve_feet([hip_l, hip_r], [foot_a, foot_b], min_leg, max_leg, min_sep);

    let bend_blend = smoothstep(0.25, 0.8, side_t);
    let side_l = lerp(-1.0, -dir, bend_blend);
    let side_r = lerp(1.0, -dir, bend_blend);
    let bend_base = 3.0 * s * (0.55 + 0.45 * side_t) * hang_damp;
    let knee = |hip: Vec2, foot: Vec2, sign: f32, lift: f32| {
        let d = foot - hip;
        let len = d.length();
        let len = if len > 1e-6 { len } else { 1.0 };
        let perp = Vec2::new(-d.y / len, d.x / len) * sign;
        (hip + foot) * 0.5 + perp * bend_base * (0.22 + 0.78 * lift)
    };

    let far_mul = lerp(1.0, 0.78, side_t);
    let near_mix = smoothstep(-0.18, 0.18, body_yaw);
    let legs = [
        LegPose {
            hip: hip_l,
            knee: knee(hip_l, foot_a, side_l, lift_a),
            foot: foot_a,
            lift: lift_a,
            alpha: lerp(1.0, far_mul, near_mix),
        },
        LegPose {
            hip: hip_r,
            knee: knee(hip_r, foot_b, side_r, lift_b),
            foot: foot_b,
            lift: lift_b,
            alpha: lerp(far_mul, 1.0, near_mix),
        },
    ];
    let leg_order = if swing_fwd_raw >= 0.0 { [1, 0] } else { [0, 1] };

    // Backpack
    let pack_w = 10.0 * s * rig.pack;
    let pack_h = 16.0 * s * rig.pack;
    let pack = [
        torso_cx - pack_w * 0.5,
        lerp(torso_top, hip_y, 0.25),
        pack_w,
        pack_h,
    ];

    WalkerPose {
        s,
        dpr,
        x,
        foot_y,
        side_t,
        look_yaw: yaw,
        look_pitch: pitch,
        bass_m,
        mids_m,
        air_m,
        kick_m,
        head_rest,
        head,
        head_r,
        visor: VisorPose {
            center: visor_center,
            w: vw,
            h: vh,
            edge_x,
        },
        torso_top,
        torso_cx,
        shoulder_y,
        hip_y,
        arms,
        legs,
        leg_order,
        min_leg,
        max_leg,
        min_sep,
        pack,
    }
}

/// Project `foot` onto the ring of radii [lo, hi] around `hip`
fn project_length(hip: Vec2, foot: Vec2, lo: f32, hi: f32) -> Vec2 {
    let d = foot - hip;
    let dist = d.length();
    let dir = if dist > 1e-6 { d / dist } else { Vec2::Y };
    hip + dir * clamp(dist, lo, hi)
}

/// Restore the length bounds by moving only the foot's Y, so horizontal
/// separation survives. Falls back to shortening the reach when the foot is
/// horizontally out of range.
fn resolve_length_y(hip: Vec2, foot: Vec2, lo: f32, hi: f32) -> Vec2 {
    let d = foot - hip;
    let dist = d.length();
    if dist >= lo && dist <= hi {
        return foot;
    }
    let target = clamp(dist, lo, hi);
    let dx = clamp(d.x, -target, target);
    let dy = (target * target - dx * dx).max(0.0).sqrt();
    let sign = if d.y < 0.0 { -1.0 } else { 1.0 };
    Vec2::new(hip.x + dx, hip.y + dy * sign)
}

/// Leg solve: keep each foot within [min_leg, max_leg] of its hip and the
/// left foot at least `min_sep` left of the right foot.
fn solve_feet(hips: [Vec2; 2], feet: [Vec2; 2], min_leg: f32, max_leg: f32, min_sep: f32) -> [Vec2; 2] {
    let mut a = project_length(hips[0], feet[0], min_leg, max_leg);
    let mut b = project_length(hips[1], feet[1], min_leg, max_leg);

    for _ in 0..LEG_SOLVE_PASSES {
        if a.x <= b.x - min_sep {
            break;
        }
        let mid = (a.x + b.x) * 0.5;
        a.x = mid - min_sep * 0.5;
        b.x = mid + min_sep * 0.5;
        a = resolve_length_y(hips[0], a, min_leg, max_leg);
        b = resolve_length_y(hips[1], b, min_leg, max_leg);
    }
    [a, b]
}

/// Paint a solved pose
pub fn draw_walker(canvas: &mut dyn Canvas, pose: &WalkerPose, style: &WalkerStyle) {
    let alpha = clamp01(finite_or(style.alpha, 0.0));
    if alpha <= 0.001 {
        return;
    }
    let s = pose.s;
    let dpr = pose.dpr;
    let lw = style.line_width.unwrap_or((1.35 * s).max(1.0)).max(1.0);
    let lines = &style.lines;
    let r = pose.head_r;
    let (bass_m, air_m, kick_m) = (pose.bass_m, pose.air_m, pose.kick_m);

    if lines.glow && style.glow > 0.0 {
        let halo = Ink::green(clamp(alpha * (0.05 + style.glow * 0.35), 0.0, 0.45)).lighter();
        if lines.head {
            canvas.stroke_circle(pose.head, r, lw * 2.25, halo);
        }
        canvas.stroke_line(pose.arms[0].shoulder, pose.arms[1].shoulder, lw * 2.25, halo);
    }

    if lines.head {
        canvas.stroke_circle(pose.head, r, lw, Ink::green(alpha));
    }

    if lines.head && lines.glass {
        let glass_a = clamp(
            alpha * style.glass * (0.12 + air_m * 0.22 + kick_m * 0.14 + bass_m * 0.12),
            0.0,
            0.55,
        );
        if glass_a > 0.001 {
            let inset = (0.9 * dpr).floor().max(1.0);
            canvas.push_clip_circle(pose.head, (r - inset).max(1.0));

            let glow = RadialGlow {
                focal: pose.head
                    + Vec2::new(
                        -r * 0.38 + pose.look_yaw * r * 0.12,
                        -r * 0.52 + pose.look_pitch * r * 0.1,
                    ),
                center: pose.head,
                radius: r * 1.18,
                rgb: PHOSPHOR,
                stops: vec![
                    (0.0, (glass_a * 1.7).min(0.45)),
                    (0.35, (glass_a * 0.9).min(0.34)),
                    (1.0, (glass_a * 0.16).min(0.12)),
                ],
                blend: Blend::Lighter,
            };
            let hc = pose.head_rest;
            canvas.fill_glow(hc.x - r * 1.25, hc.y - r * 1.25, r * 2.5, r * 2.5, &glow);

            let streak_a = (glass_a * 0.62).min(0.18);
            if streak_a > 0.001 {
                canvas.stroke_line(
                    hc + Vec2::new(-r * 0.62, -r * 0.18),
                    hc + Vec2::new(r * 0.42, r * 0.58),
                    (0.85 * dpr).floor().max(1.0),
                    Ink::green(streak_a).lighter(),
                );
                canvas.stroke_line(
                    hc + Vec2::new(-r * 0.46, -r * 0.58),
                    hc + Vec2::new(r * 0.18, r * 0.22),
                    (0.7 * dpr).floor().max(1.0),
                    Ink::green((streak_a * 0.75).min(0.16)).lighter(),
                );
            }
            canvas.pop_clip();
        }
    }

    let v = &pose.visor;
    let (vx, vy) = (v.center.x - v.w * 0.5, v.center.y - v.h * 0.5);
    if lines.head && lines.visor {
        canvas.stroke_rect(vx, vy, v.w, v.h, lw, Ink::green(alpha * 0.72));
        if let Some(edge_x) = v.edge_x {
            canvas.stroke_line(
                Vec2::new(edge_x, vy),
                Vec2::new(edge_x, vy + v.h),
                (0.9 * dpr).floor().max(1.0),
                Ink::green(clamp(alpha * (0.22 + pose.side_t * 0.35), 0.0, 0.9)).lighter(),
            );
        }
        if lines.visor_fill {
            let fill_a = clamp(
                alpha * style.visor_fill * (0.06 + air_m * 0.1 + kick_m * 0.08 + bass_m * 0.05),
                0.0,
                0.3,
            );
            if fill_a > 0.001 {
                canvas.fill_rect(vx, vy, v.w, v.h, Ink::green(fill_a));
            }
        }
    }

    if lines.arms {
        for arm in &pose.arms {
            canvas.stroke_line(arm.shoulder, arm.hand, lw, Ink::green(alpha * arm.alpha));
        }
    }

    if lines.legs {
        for &i in &pose.leg_order {
            let leg = &pose.legs[i];
            canvas.stroke_polyline(&[leg.hip, leg.knee, leg.foot], lw, Ink::green(alpha * leg.alpha));
        }
    }

    if lines.backpack {
        let [px, py, pw, ph] = pose.pack;
        canvas.stroke_rect(px, py, pw, ph, lw, Ink::green(alpha * 0.78));
        let pulse = 0.035 + bass_m * 0.16 + air_m * 0.08 + kick_m * 0.2;
        canvas.fill_rect(px, py, pw, ph, Ink::green(clamp(alpha * pulse, 0.0, 0.35)));
    }

    if lines.ground && style.ground_half_width > 0.0 {
        let y = pose.foot_y + 0.18 * s;
        canvas.stroke_line(
            Vec2::new(pose.x - style.ground_half_width, y),
            Vec2::new(pose.x + style.ground_half_width, y),
            (lw * 0.78).max(1.0),
            Ink::green(clamp(alpha * (0.18 + style.glow * 0.22), 0.0, 0.55)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawOp, RecordingCanvas};

    fn idle_input() -> RigInput {
        RigInput {
            x: 200.0,
            foot_y: 300.0,
            ground_y: 300.0,
            ..Default::default()
        }
    }

    fn check_legs(pose: &WalkerPose) {
        let eps = 1e-2;
        for leg in &pose.legs {
            let len = leg.length();
            assert!(
                len >= pose.min_leg - eps && len <= pose.max_leg + eps,
                "leg length {} outside [{}, {}]",
                len,
                pose.min_leg,
                pose.max_leg
            );
        }
        assert!(
            pose.foot_gap() >= pose.min_sep - eps,
            "foot gap {} < {}",
            pose.foot_gap(),
            pose.min_sep
        );
    }

    #[test]
    fn test_idle_pose_scenario() {
        // Paused, motion 0, facing the viewer, phase 0
        let pose = solve_pose(&idle_input(), &RigParams::default());

        assert_eq!(pose.side_t, 0.0);
        assert_eq!(pose.visor.edge_x, None);
        assert_eq!(pose.visor.w, 12.0);
        assert_eq!(pose.legs[0].lift, 0.0);
        assert_eq!(pose.legs[1].lift, 0.0);

        // No stride when paused: the hips are narrower than the minimum
        // stance, so the feet settle min_sep apart about the torso, on the foot line
        assert!((pose.foot_gap() - pose.min_sep).abs() < 1e-3);
        let mid = (pose.legs[0].foot.x + pose.legs[1].foot.x) * 0.5;
        assert!((mid - pose.torso_cx).abs() < 1e-3);
        assert!((pose.legs[0].foot.y - 300.0).abs() < 1e-3);
        assert!((pose.legs[1].foot.y - 300.0).abs() < 1e-3);

        // Arms hang outward, never crossing the body
        assert!(pose.arms[0].hand.x > pose.arms[0].shoulder.x - 18.0);
        assert!(pose.arms[0].hand.y > pose.shoulder_y);
        assert!(pose.arms[1].hand.y > pose.shoulder_y);
        check_legs(&pose);
    }

    #[test]
    fn test_leg_invariant_at_extremes() {
        for &body_yaw in &[-0.95, -0.5, 0.0, 0.3, 0.95] {
            for &motion in &[0.0, 0.5, 1.0] {
                for &hang in &[0.0, 0.5, 1.0] {
                    for i in 0..24 {
                        let input = RigInput {
                            body_yaw,
                            look_yaw: body_yaw,
                            motion,
                            hang,
                            foot_y: 300.0 - 74.0 * 2.0 * hang,
                            phase: i as f32 * 0.27,
                            bass: 1.0,
                            mids: 1.0,
                            air: 1.0,
                            kick: 1.0,
                            playing: true,
                            dpr: 2.0,
                            ..idle_input()
                        };
                        check_legs(&solve_pose(&input, &RigParams::default()));
                    }
                }
            }
        }
    }

    #[test]
    fn test_profile_narrows_visor_and_adds_edge() {
        let input = RigInput {
            body_yaw: 0.95,
            look_yaw: -0.6,
            ..idle_input()
        };
        let pose = solve_pose(&input, &RigParams::default());
        assert!(pose.side_t > 0.99);
        assert!(pose.visor.w < 12.0 * 0.2);
        let edge = pose.visor.edge_x.unwrap();
        assert!(edge < pose.visor.center.x, "edge follows the look direction");
        // Right arm is the near one when turned right
        assert_eq!(pose.arms[1].alpha, 1.0);
    }

    #[test]
    fn test_far_leg_drawn_first() {
        let fwd = RigInput {
            phase: -FRAC_PI_2,
            motion: 1.0,
            ..idle_input()
        };
        assert_eq!(solve_pose(&fwd, &RigParams::default()).leg_order, [1, 0]);
        let back = RigInput {
            phase: FRAC_PI_2,
            ..fwd
        };
        assert_eq!(solve_pose(&back, &RigParams::default()).leg_order, [0, 1]);
    }

    #[test]
    fn test_non_finite_input_is_total() {
        let input = RigInput {
            x: f32::NAN,
            foot_y: f32::INFINITY,
            motion: f32::NAN,
            body_yaw: f32::NEG_INFINITY,
            phase: f32::NAN,
            dpr: f32::NAN,
            scale: f32::NAN,
            ..Default::default()
        };
        let pose = solve_pose(&input, &RigParams::default());
        assert!(pose.head.is_finite());
        for leg in &pose.legs {
            assert!(leg.hip.is_finite() && leg.knee.is_finite() && leg.foot.is_finite());
        }
        check_legs(&pose);
    }

    #[test]
    fn test_crouch_lowers_the_head() {
        let stand = solve_pose(&idle_input(), &RigParams::default());
        let crouch = solve_pose(
            &RigInput {
                crouch: 1.0,
                ..idle_input()
            },
            &RigParams::default(),
        );
        assert!(crouch.head.y > stand.head.y + 6.0);
        assert!(crouch.arms[0].shoulder.distance(crouch.arms[0].hand) < 18.0);
    }

    #[test]
    fn test_draw_emits_expected_parts() {
        let pose = solve_pose(
            &RigInput {
                motion: 1.0,
                bass: 0.5,
                kick: 0.5,
                ..idle_input()
            },
            &RigParams::default(),
        );
        let mut canvas = RecordingCanvas::new(400, 400);
        draw_walker(&mut canvas, &pose, &WalkerStyle::with_alpha(0.8));

        let ops = canvas.take();
        let rings = ops.iter().filter(|op| matches!(op, DrawOp::StrokeCircle { .. })).count();
        let legs = ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Polyline { points, .. } if points.len() == 3))
            .count();
        assert_eq!(rings, 1);
        assert_eq!(legs, 2);
        assert!(ops.iter().any(|op| matches!(op, DrawOp::Glow { .. })));

        // Clip is balanced
        let pushes = ops.iter().filter(|op| matches!(op, DrawOp::PushClip { .. })).count();
        let pops = ops.iter().filter(|op| matches!(op, DrawOp::PopClip)).count();
        assert_eq!(pushes, pops);

        for ink in ops.iter().filter_map(DrawOp::ink) {
            assert!(ink.alpha <= 0.8 + 1e-6);
        }
    }

    #[test]
    fn test_transparent_walker_draws_nothing() {
        let pose = solve_pose(&idle_input(), &RigParams::default());
        let mut canvas = RecordingCanvas::new(400, 400);
        draw_walker(&mut canvas, &pose, &WalkerStyle::with_alpha(0.0));
        assert!(canvas.ops.is_empty());
    }
}
