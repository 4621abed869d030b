//! Painters for the two canvases and the still exporter.

mod ambient;
mod canvas;
mod glyphs;
mod rig;
mod scene;
mod spectrum;
mod stars;
mod still;

pub use ambient::{Ambient, AmbientDrive, BgPixel, Particle, StepDrive, WaveLine};
pub use canvas::{
    Blend, Canvas, DrawOp, Ink, PixmapCanvas, RadialGlow, RecordingCanvas, PHOSPHOR,
};
pub use glyphs::{draw_text, text_height, text_width, GLYPH_H, GLYPH_W};
pub use rig::{
    draw_walker, solve_pose, ArmPose, LegPose, RigInput, RigLines, RigParams, VisorPose,
    WalkerPose, WalkerStyle, LEG_SOLVE_PASSES, PITCH_LIMIT, YAW_LIMIT,
};
pub use scene::{SceneInputs, SceneRenderer};
pub use spectrum::{SpectrumLayout, SpectrumRenderer};
pub use stars::{Star, StarDrive, StarField};
pub use still::{export_png, render_still, PosePreset, StillParams, EXPORT_DPR};
