//! Spectrum layout: frequency mapping and bar display parameters.

use serde::{Deserialize, Serialize};

/// Column layout and frequency mapping for the spectrum display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// Number of visual columns
    pub columns: usize,

    /// Number of lit segments per column
    pub segments: usize,

    /// Lowest mapped frequency (Hz)
    pub min_hz: f32,

    /// Highest mapped frequency (Hz)
    pub max_hz: f32,

    /// End of the low segment (Hz)
    pub low_break_hz: f32,

    /// End of the mid segment (Hz)
    pub mid_break_hz: f32,

    /// Share of columns given to the low segment (0-1)
    pub low_share: f32,

    /// Share of columns given to the mid segment (0-1)
    pub mid_share: f32,

    /// Share of columns given to the high segment (0-1)
    pub high_share: f32,

    /// Axis tick frequencies (Hz), filtered to [min_hz, max_hz]
    pub ticks_hz: Vec<f32>,

    /// Bar attack (per-frame interpolation fraction)
    pub bar_attack: f32,

    /// Bar release (per-frame interpolation fraction)
    pub bar_release: f32,

    /// Peak-hold fall per frame (level units)
    pub peak_decay: f32,

    /// Peak marker thickness (CSS px)
    pub peak_thick_px: f32,

    /// Fraction of a column slot filled by the bar
    pub col_fill: f32,

    /// Gap between columns (CSS px)
    pub col_gap_px: f32,

    /// Gap between segments (CSS px)
    pub seg_gap_px: f32,

    /// Grid line alpha
    pub grid_alpha: f32,

    /// Scanline alpha
    pub scan_alpha: f32,

    /// Height reserved for the Hz axis labels (CSS px)
    pub label_height_px: f32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            columns: 40,
            segments: 18,
            min_hz: 18.0,
            max_hz: 18000.0,
            low_break_hz: 220.0,
            mid_break_hz: 5000.0,
            low_share: 0.22,
            mid_share: 0.58,
            high_share: 0.2,
            ticks_hz: vec![
                32.0, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
            ],
            bar_attack: 0.62,
            bar_release: 0.26,
            peak_decay: 0.022,
            peak_thick_px: 2.0,
            col_fill: 0.92,
            col_gap_px: 2.0,
            seg_gap_px: 3.0,
            grid_alpha: 0.06,
            scan_alpha: 0.045,
            label_height_px: 26.0,
        }
    }
}
