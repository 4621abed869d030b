//! Segmented column spectrum with peak hold and a Hz axis.

use glam::Vec2;

use super::canvas::{Canvas, Ink};
use super::glyphs::{draw_text, text_width};
use crate::freq_map::FrequencyMap;
use crate::math::{clamp, format_hz};
use crate::params::SpectrumConfig;

/// Bar levels and peak markers, smoothed across frames
pub struct SpectrumRenderer {
    config: SpectrumConfig,
    smooth: Vec<f32>,
    peaks: Vec<f32>,
}

/// Pixel layout of the plot for one canvas size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumLayout {
    pub label_h: f32,
    pub plot_h: f32,
    pub col_w: f32,
    pub inner_w: f32,
    pub seg_h: f32,
    pub seg_gap: f32,
    pub top_pad: f32,
}

impl SpectrumRenderer {
    pub fn new(config: SpectrumConfig) -> Self {
        let columns = config.columns;
        Self {
            config,
            smooth: vec![0.0; columns],
            peaks: vec![0.0; columns],
        }
    }

    pub fn levels(&self) -> &[f32] {
        &self.smooth
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn layout(&self, w: f32, h: f32, dpr: f32) -> SpectrumLayout {
        let c = &self.config;
        let segments = c.segments.max(1) as f32;
        let label_h = (c.label_height_px * dpr).floor();
        let plot_h = (h - label_h).max(1.0);
        let col_w = w / c.columns.max(1) as f32;
        let col_gap = (c.col_gap_px * dpr).floor().max(0.0);
        let seg_gap = (c.seg_gap_px * dpr).floor().max(0.0);
        let inner_w = ((col_w * c.col_fill).floor() - col_gap).max(1.0);

        let total_gap = (segments - 1.0) * seg_gap;
        let seg_h = ((plot_h - total_gap) / segments).floor().max(1.0);
        let used = segments * seg_h + total_gap;
        let top_pad = ((plot_h - used) / 2.0).floor().max(0.0);

        SpectrumLayout {
            label_h,
            plot_h,
            col_w,
            inner_w,
            seg_h,
            seg_gap,
            top_pad,
        }
    }

    /// Fold one frame of column levels into the bar and peak state
    pub fn update(&mut self, columns: &[f32]) {
        let c = &self.config;
        if self.smooth.len() != columns.len() {
            self.smooth = vec![0.0; columns.len()];
            self.peaks = vec![0.0; columns.len()];
        }
        for ((s, p), &t) in self.smooth.iter_mut().zip(self.peaks.iter_mut()).zip(columns) {
            let k = if t > *s { c.bar_attack } else { c.bar_release };
            *s += (t - *s) * k;
            *p = s.max(*p - c.peak_decay);
        }
    }

    /// Redraw the whole canvas. `columns` is `None` while no audio is connected.
    pub fn draw(&mut self, canvas: &mut dyn Canvas, columns: Option<&[f32]>, map: &FrequencyMap, dpr: f32) {
        let dpr = dpr.max(0.1);
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        canvas.clear();
        canvas.fill_rect(0.0, 0.0, w, h, Ink::black(0.14));

        let l = self.layout(w, h, dpr);
        let segments = self.config.segments.max(1);
        let pitch = l.seg_h + l.seg_gap;

        let grid = Ink::green(self.config.grid_alpha);
        for s in 0..=segments {
            let y = (l.top_pad + s as f32 * pitch).floor() + 0.5;
            canvas.stroke_line(Vec2::new(0.0, y), Vec2::new(w, y), 1.0, grid);
        }

        let Some(columns) = columns.filter(|c| c.len() == self.config.columns) else {
            let cell = (12.0 * dpr / 5.0).round().max(2.0);
            draw_text(
                canvas,
                Vec2::new(12.0 * dpr, 18.0 * dpr),
                "SPECTRUM OFFLINE",
                cell,
                Ink::green(0.65),
            );
            return;
        };

        self.update(columns);

        let peak_thick = (self.config.peak_thick_px * dpr).floor().max(1.0);
        for (i, (&level, &peak)) in self.smooth.iter().zip(&self.peaks).enumerate() {
            let lit = ((level * (segments as f32 + 1e-6)).floor().max(0.0) as usize).min(segments);
            let x0 = (i as f32 * l.col_w).floor();
            let x = x0 + ((l.col_w - l.inner_w) / 2.0).floor();

            for s in 0..lit {
                let y = l.top_pad + (segments - 1 - s) as f32 * pitch;
                let t = 1.0 - s as f32 / (segments.saturating_sub(1).max(1)) as f32;
                canvas.fill_rect(x, y, l.inner_w, l.seg_h, Ink::green(0.22 + 0.7 * t));
            }

            let peak_seg = ((peak * (segments - 1) as f32).floor().max(0.0) as usize).min(segments - 1);
            let peak_y = l.top_pad + (segments - 1 - peak_seg) as f32 * pitch;
            canvas.fill_rect(x, peak_y - peak_thick, l.inner_w, peak_thick, Ink::green(0.85));
        }

        let scan = Ink::green(self.config.scan_alpha);
        let step = (3.0 * dpr).floor().max(2.0) as usize;
        for y in (0..l.plot_h as usize).step_by(step) {
            canvas.fill_rect(0.0, y as f32, w, 1.0, scan);
        }

        // Axis
        let tick_ink = Ink::green(self.config.grid_alpha * 1.4);
        let tick_len = (6.0 * dpr).floor();
        let label_ink = Ink::green(0.7);
        let cell = (2.0 * dpr).floor().max(2.0);
        for &hz in map.ticks() {
            let xn = map.hz_to_x_norm(hz);
            let x = (xn * w).floor();
            canvas.stroke_line(
                Vec2::new(x + 0.5, l.plot_h),
                Vec2::new(x + 0.5, l.plot_h + tick_len),
                1.0,
                tick_ink,
            );

            let label = format_hz(hz);
            let tw = text_width(&label, cell);
            let xx = clamp(x - tw / 2.0, 2.0, (w - tw - 2.0).max(2.0));
            draw_text(canvas, Vec2::new(xx, l.plot_h + (8.0 * dpr).floor()), &label, cell, label_ink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DrawOp, RecordingCanvas};

    fn renderer() -> (SpectrumRenderer, FrequencyMap) {
        let config = SpectrumConfig::default();
        let map = FrequencyMap::new(&config);
        (SpectrumRenderer::new(config), map)
    }

    #[test]
    fn test_layout_fits_plot() {
        let (r, _) = renderer();
        let l = r.layout(960.0, 240.0, 1.0);
        assert_eq!(l.label_h, 26.0);
        assert_eq!(l.plot_h, 214.0);
        assert_eq!(l.col_w, 24.0);
        // floor(24 * 0.92) - 2
        assert_eq!(l.inner_w, 20.0);
        // floor((214 - 17 * 3) / 18)
        assert_eq!(l.seg_h, 9.0);
        let used = 18.0 * l.seg_h + 17.0 * l.seg_gap;
        assert!(l.top_pad + used <= l.plot_h);
    }

    #[test]
    fn test_attack_release_and_peak_hold() {
        let (mut r, _) = renderer();
        let mut cols = vec![0.0; 40];
        cols[3] = 1.0;
        r.update(&cols);
        assert!((r.levels()[3] - 0.62).abs() < 1e-6);
        assert!((r.peaks()[3] - 0.62).abs() < 1e-6);

        cols[3] = 0.0;
        r.update(&cols);
        assert!((r.levels()[3] - 0.62 * 0.74).abs() < 1e-6);
        assert!((r.peaks()[3] - (0.62 - 0.022)).abs() < 1e-6);
    }

    #[test]
    fn test_offline_draws_status_text_only() {
        let (mut r, map) = renderer();
        let mut canvas = RecordingCanvas::new(960, 240);
        r.draw(&mut canvas, None, &map, 1.0);
        // Clear, background, 19 grid lines, then glyph rects at alpha 0.65
        assert_eq!(canvas.ops[0], DrawOp::Clear);
        let text = canvas
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillRect { ink, .. } if (ink.alpha - 0.65).abs() < 1e-6))
            .count();
        assert!(text > 16);
    }

    #[test]
    fn test_full_level_lights_every_segment() {
        let (mut r, map) = renderer();
        let cols = vec![1.0; 40];
        for _ in 0..40 {
            r.update(&cols);
        }
        let mut canvas = RecordingCanvas::new(960, 240);
        r.draw(&mut canvas, Some(&cols), &map, 1.0);

        let l = r.layout(960.0, 240.0, 1.0);
        let bars = canvas
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillRect { h, w, .. } if *h == l.seg_h && *w == l.inner_w))
            .count();
        assert_eq!(bars, 40 * 18);
    }
}
