//! 2-D drawing surface used by every painter.
//!
//! Painters only see the [`Canvas`] trait. Live and offline output goes through
//! [`PixmapCanvas`] (tiny-skia), tests use [`RecordingCanvas`] to inspect the
//! emitted primitives without rasterising anything.

use glam::Vec2;
use tiny_skia::{
    BlendMode, Color, FillRule, GradientStop, LineCap, LineJoin, Mask, Paint, PathBuilder,
    Pixmap, Point, RadialGradient, Rect, Shader, SpreadMode, Stroke, Transform,
};

use crate::error::EngineError;
use crate::math::{clamp01, finite_or};

/// Phosphor green used by the whole display
pub const PHOSPHOR: [u8; 3] = [0, 255, 65];

/// Compositing mode for a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    SourceOver,

    /// Additive ("lighter")
    Lighter,
}

/// Solid colour plus blend mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ink {
    pub rgb: [u8; 3],

    /// Opacity in [0, 1]
    pub alpha: f32,

    pub blend: Blend,
}

impl Ink {
    pub fn green(alpha: f32) -> Self {
        Self {
            rgb: PHOSPHOR,
            alpha: clamp01(finite_or(alpha, 0.0)),
            blend: Blend::SourceOver,
        }
    }

    pub fn black(alpha: f32) -> Self {
        Self {
            rgb: [0, 0, 0],
            ..Self::green(alpha)
        }
    }

    pub fn lighter(mut self) -> Self {
        self.blend = Blend::Lighter;
        self
    }

    /// Too faint to change any pixel
    pub fn is_invisible(&self) -> bool {
        self.alpha <= 0.001
    }
}

/// Radial glow: colour stops between a focal point and a circle
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGlow {
    pub focal: Vec2,
    pub center: Vec2,
    pub radius: f32,
    pub rgb: [u8; 3],

    /// (offset in [0, 1], alpha)
    pub stops: Vec<(f32, f32)>,

    pub blend: Blend,
}

/// Drawing operations needed by the spectrum, scene and rig painters.
///
/// Coordinates are device pixels with the origin at the top left.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel to transparent
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, ink: Ink);
    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, ink: Ink);

    /// Open polyline with round caps and joins
    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, ink: Ink);

    fn fill_circle(&mut self, center: Vec2, r: f32, ink: Ink);
    fn stroke_circle(&mut self, center: Vec2, r: f32, width: f32, ink: Ink);

    /// Fill a rectangle with a radial gradient
    fn fill_glow(&mut self, x: f32, y: f32, w: f32, h: f32, glow: &RadialGlow);

    /// Restrict further drawing to a circle until [`Canvas::pop_clip`]
    fn push_clip_circle(&mut self, center: Vec2, r: f32);
    fn pop_clip(&mut self);

    fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, ink: Ink) {
        self.stroke_polyline(&[a, b], width, ink);
    }
}

fn to_color(rgb: [u8; 3], alpha: f32) -> Color {
    Color::from_rgba8(rgb[0], rgb[1], rgb[2], (clamp01(alpha) * 255.0).round() as u8)
}

fn to_blend(blend: Blend) -> BlendMode {
    match blend {
        Blend::SourceOver => BlendMode::SourceOver,
        Blend::Lighter => BlendMode::Plus,
    }
}

fn solid(ink: Ink) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.shader = Shader::SolidColor(to_color(ink.rgb, ink.alpha));
    paint.blend_mode = to_blend(ink.blend);
    paint.anti_alias = true;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width: finite_or(width, 1.0).max(0.1),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        miter_limit: 2.0,
        ..Default::default()
    }
}

fn finite_point(p: Vec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// tiny-skia backed surface; contents persist between frames
pub struct PixmapCanvas {
    pixmap: Pixmap,
    clip: Option<Mask>,
}

impl PixmapCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, EngineError> {
        let pixmap = Pixmap::new(width.max(1), height.max(1)).ok_or_else(|| {
            EngineError::Config(format!("invalid canvas size {}x{}", width, height))
        })?;
        Ok(Self { pixmap, clip: None })
    }

    /// Resize the backing store; a no-op when the size is unchanged.
    /// Returns true when the surface was reallocated (contents are lost).
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let (w, h) = (width.max(1), height.max(1));
        if w == self.pixmap.width() && h == self.pixmap.height() {
            return false;
        }
        match Pixmap::new(w, h) {
            Some(p) => {
                self.pixmap = p;
                self.clip = None;
                true
            }
            None => false,
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Premultiplied RGBA8 pixel data, row-major
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Straight-alpha RGBA image for PNG export
    pub fn to_image(&self) -> image::RgbaImage {
        let mut out = image::RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    fn fill_path_with(&mut self, path: &tiny_skia::Path, paint: &Paint) {
        self.pixmap.fill_path(
            path,
            paint,
            FillRule::Winding,
            Transform::identity(),
            self.clip.as_ref(),
        );
    }

    fn stroke_path_with(&mut self, path: &tiny_skia::Path, paint: &Paint, width: f32) {
        self.pixmap.stroke_path(
            path,
            paint,
            &round_stroke(width),
            Transform::identity(),
            self.clip.as_ref(),
        );
    }
}

impl Canvas for PixmapCanvas {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, ink: Ink) {
        if ink.is_invisible() {
            return;
        }
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &solid(ink), Transform::identity(), self.clip.as_ref());
        }
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, ink: Ink) {
        if ink.is_invisible() {
            return;
        }
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let mut stroke = round_stroke(width);
        stroke.line_join = LineJoin::Miter;
        self.pixmap.stroke_path(
            &path,
            &solid(ink),
            &stroke,
            Transform::identity(),
            self.clip.as_ref(),
        );
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, ink: Ink) {
        if ink.is_invisible() || points.len() < 2 || !points.iter().all(|p| finite_point(*p)) {
            return;
        }
        let mut pb = PathBuilder::new();
        pb.move_to(points[0].x, points[0].y);
        for p in &points[1..] {
            pb.line_to(p.x, p.y);
        }
        if let Some(path) = pb.finish() {
            self.stroke_path_with(&path, &solid(ink), width);
        }
    }

    fn fill_circle(&mut self, center: Vec2, r: f32, ink: Ink) {
        if ink.is_invisible() || !finite_point(center) {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, r) {
            self.fill_path_with(&path, &solid(ink));
        }
    }

    fn stroke_circle(&mut self, center: Vec2, r: f32, width: f32, ink: Ink) {
        if ink.is_invisible() || !finite_point(center) {
            return;
        }
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, r) {
            self.stroke_path_with(&path, &solid(ink), width);
        }
    }

    fn fill_glow(&mut self, x: f32, y: f32, w: f32, h: f32, glow: &RadialGlow) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let stops = glow
            .stops
            .iter()
            .map(|&(pos, a)| GradientStop::new(clamp01(pos), to_color(glow.rgb, a)))
            .collect();
        let Some(shader) = RadialGradient::new(
            Point::from_xy(glow.focal.x, glow.focal.y),
            Point::from_xy(glow.center.x, glow.center.y),
            glow.radius.max(0.5),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };
        let paint = Paint {
            shader,
            blend_mode: to_blend(glow.blend),
            anti_alias: true,
            ..Default::default()
        };
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), self.clip.as_ref());
    }

    fn push_clip_circle(&mut self, center: Vec2, r: f32) {
        let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) else {
            return;
        };
        if let Some(path) = PathBuilder::from_circle(center.x, center.y, r.max(0.5)) {
            mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
        }
        self.clip = Some(mask);
    }

    fn pop_clip(&mut self) {
        self.clip = None;
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    FillRect { x: f32, y: f32, w: f32, h: f32, ink: Ink },
    StrokeRect { x: f32, y: f32, w: f32, h: f32, width: f32, ink: Ink },
    Polyline { points: Vec<Vec2>, width: f32, ink: Ink },
    FillCircle { center: Vec2, r: f32, ink: Ink },
    StrokeCircle { center: Vec2, r: f32, width: f32, ink: Ink },
    Glow { x: f32, y: f32, w: f32, h: f32, glow: RadialGlow },
    PushClip { center: Vec2, r: f32 },
    PopClip,
}

impl DrawOp {
    /// Ink of solid primitives
    pub fn ink(&self) -> Option<Ink> {
        match self {
            DrawOp::FillRect { ink, .. }
            | DrawOp::StrokeRect { ink, .. }
            | DrawOp::Polyline { ink, .. }
            | DrawOp::FillCircle { ink, .. }
            | DrawOp::StrokeCircle { ink, .. } => Some(*ink),
            _ => None,
        }
    }
}

/// Canvas that only records calls, for tests and inspection
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn take(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, ink: Ink) {
        self.ops.push(DrawOp::FillRect { x, y, w, h, ink });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, ink: Ink) {
        self.ops.push(DrawOp::StrokeRect { x, y, w, h, width, ink });
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, ink: Ink) {
        self.ops.push(DrawOp::Polyline {
            points: points.to_vec(),
            width,
            ink,
        });
    }

    fn fill_circle(&mut self, center: Vec2, r: f32, ink: Ink) {
        self.ops.push(DrawOp::FillCircle { center, r, ink });
    }

    fn stroke_circle(&mut self, center: Vec2, r: f32, width: f32, ink: Ink) {
        self.ops.push(DrawOp::StrokeCircle {
            center,
            r,
            width,
            ink,
        });
    }

    fn fill_glow(&mut self, x: f32, y: f32, w: f32, h: f32, glow: &RadialGlow) {
        self.ops.push(DrawOp::Glow {
            x,
            y,
            w,
            h,
            glow: glow.clone(),
        });
    }

    fn push_clip_circle(&mut self, center: Vec2, r: f32) {
        self.ops.push(DrawOp::PushClip { center, r });
    }

    fn pop_clip(&mut self) {
        self.ops.push(DrawOp::PopClip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ink_clamps_alpha() {
        assert_eq!(Ink::green(1.7).alpha, 1.0);
        assert_eq!(Ink::green(f32::NAN).alpha, 0.0);
        assert!(Ink::green(0.0005).is_invisible());
        assert_eq!(Ink::green(0.5).lighter().blend, Blend::Lighter);
    }

    #[test]
    fn test_pixmap_fill_and_lighter_blend() {
        let mut canvas = PixmapCanvas::new(8, 8).unwrap();
        canvas.fill_rect(0.0, 0.0, 8.0, 8.0, Ink::black(1.0));
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Ink::green(0.5).lighter());
        canvas.fill_rect(0.0, 0.0, 4.0, 4.0, Ink::green(0.5).lighter());

        // Pixel (1, 1): two additive half-strength greens saturate
        let i = (8 + 1) * 4;
        let px = &canvas.data()[i..i + 4];
        assert!(px[1] >= 250, "green channel {}", px[1]);
        assert_eq!(px[0], 0);

        // Pixel (6, 6) stays black
        let j = (6 * 8 + 6) * 4;
        assert_eq!(&canvas.data()[j..j + 3], &[0, 0, 0]);
    }

    #[test]
    fn test_resize_reports_reallocation() {
        let mut canvas = PixmapCanvas::new(4, 4).unwrap();
        assert!(!canvas.resize(4, 4));
        assert!(canvas.resize(10, 0));
        assert_eq!((canvas.width(), canvas.height()), (10, 1));
    }

    #[test]
    fn test_clip_limits_fill() {
        let mut canvas = PixmapCanvas::new(20, 20).unwrap();
        canvas.push_clip_circle(Vec2::new(10.0, 10.0), 3.0);
        canvas.fill_rect(0.0, 0.0, 20.0, 20.0, Ink::green(1.0));
        canvas.pop_clip();

        let at = |x: usize, y: usize| canvas.data()[(y * 20 + x) * 4 + 3];
        assert!(at(10, 10) > 200);
        assert_eq!(at(1, 1), 0);
    }

    #[test]
    fn test_non_finite_geometry_is_skipped() {
        let mut canvas = PixmapCanvas::new(4, 4).unwrap();
        canvas.stroke_polyline(
            &[Vec2::new(f32::NAN, 0.0), Vec2::new(2.0, 2.0)],
            1.0,
            Ink::green(1.0),
        );
        canvas.fill_circle(Vec2::new(f32::INFINITY, 1.0), 2.0, Ink::green(1.0));
        assert!(canvas.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_png_export_demultiplies() {
        let mut canvas = PixmapCanvas::new(2, 2).unwrap();
        canvas.fill_rect(0.0, 0.0, 2.0, 2.0, Ink::green(0.5));
        let img = canvas.to_image();
        let p = img.get_pixel(0, 0);
        assert!(p[1] >= 250);
        assert!((p[3] as i32 - 128).abs() <= 1);
    }
}
