//! Column to frequency mapping.
//!
//! Visual columns are split into three log-spaced sub-ranges (low, mid, high)
//! with the mid range getting the most columns. The inverse mapping places
//! axis ticks on the same three-segment scale.

use crate::math::{clamp, log_space};
use crate::params::SpectrumConfig;

/// Column edges and the segment layout they were built from
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyMap {
    /// N + 1 strictly increasing edge frequencies (Hz)
    edges: Vec<f32>,

    min_hz: f32,
    max_hz: f32,

    /// Effective low/mid break frequencies after clamping (Hz)
    low_end: f32,
    mid_end: f32,

    /// Normalized screen share of each segment
    shares: [f32; 3],

    ticks: Vec<f32>,
}

impl FrequencyMap {
    pub fn new(config: &SpectrumConfig) -> Self {
        let columns = config.columns.max(1);
        let min_hz = config.min_hz.max(1e-3);
        let max_hz = config.max_hz.max(min_hz + 2.0);

        let low_end = clamp(config.low_break_hz, min_hz + 1.0, max_hz - 1.0);
        let mid_end = clamp(config.mid_break_hz, low_end + 10.0, max_hz - 1.0);
        // Narrow ranges can leave no room for the +10 Hz gap
        let mid_end = if mid_end <= low_end {
            (low_end + max_hz) * 0.5
        } else {
            mid_end
        };

        let counts = segment_columns(columns, config.low_share, config.high_share);
        let edges = build_edges(counts, [min_hz, low_end, mid_end, max_hz]);

        let raw = [
            config.low_share.max(0.0),
            config.mid_share.max(0.0),
            config.high_share.max(0.0),
        ];
        let sum: f32 = raw.iter().sum();
        let shares = if sum > 1e-6 {
            [raw[0] / sum, raw[1] / sum, raw[2] / sum]
        } else {
            [1.0 / 3.0; 3]
        };

        let ticks = config
            .ticks_hz
            .iter()
            .copied()
            .filter(|hz| *hz >= min_hz && *hz <= max_hz)
            .collect();

        Self {
            edges,
            min_hz,
            max_hz,
            low_end,
            mid_end,
            shares,
            ticks,
        }
    }

    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    pub fn columns(&self) -> usize {
        self.edges.len() - 1
    }

    /// Frequency range of one column
    pub fn column_range(&self, col: usize) -> (f32, f32) {
        let i = col.min(self.columns() - 1);
        (self.edges[i], self.edges[i + 1])
    }

    /// Geometric centre of one column (Hz)
    pub fn column_center(&self, col: usize) -> f32 {
        let (a, b) = self.column_range(col);
        (a * b).sqrt()
    }

    /// Axis tick frequencies inside the mapped range
    pub fn ticks(&self) -> &[f32] {
        &self.ticks
    }

    /// Screen-normalized position of `hz` in [0, 1]
    pub fn hz_to_x_norm(&self, hz: f32) -> f32 {
        let [p_low, p_mid, p_high] = self.shares;
        let x = if hz.is_nan() {
            self.min_hz
        } else {
            clamp(hz, self.min_hz, self.max_hz)
        };

        let seg = |lo: f32, hi: f32| (x.ln() - lo.ln()) / (hi.ln() - lo.ln()).max(1e-9);

        let xn = if x <= self.low_end {
            p_low * seg(self.min_hz, self.low_end)
        } else if x <= self.mid_end {
            p_low + p_mid * seg(self.low_end, self.mid_end)
        } else {
            p_low + p_mid + p_high * seg(self.mid_end, self.max_hz)
        };
        clamp(xn, 0.0, 1.0)
    }
}

/// Columns per segment (low, mid, high), always summing to `columns`
fn segment_columns(columns: usize, low_share: f32, high_share: f32) -> [usize; 3] {
    match columns {
        0 | 1 => return [1, 0, 0],
        2 => return [1, 0, 1],
        _ => {}
    }

    let n = columns as f32;
    let mut low = ((n * low_share.max(0.0)).round() as usize).max(1);
    let mut high = ((n * high_share.max(0.0)).round() as usize).max(1);

    // Leave at least one mid column
    while low + high >= columns {
        if low >= high && low > 1 {
            low -= 1;
        } else if high > 1 {
            high -= 1;
        } else {
            break;
        }
    }
    [low, columns - low - high, high]
}

/// Concatenate log-spaced segments, dropping duplicate joins.
///
/// A segment with zero columns is skipped and the next one starts where the
/// previous ended.
fn build_edges(counts: [usize; 3], breaks: [f32; 4]) -> Vec<f32> {
    let total: usize = counts.iter().sum();
    let mut edges = Vec::with_capacity(total + 1);
    edges.push(breaks[0]);

    let mut start = breaks[0];
    for (i, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let is_last = counts[i + 1..].iter().all(|&c| c == 0);
        let end = if is_last { breaks[3] } else { breaks[i + 1] };

        let seg = log_space(start, end, count + 1);
        edges.extend_from_slice(&seg[1..]);
        start = end;
    }

    // Pin the endpoints exactly; exp(ln(x)) can drift in the last bit
    let last = edges.len() - 1;
    edges[0] = breaks[0];
    edges[last] = breaks[3];
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(columns: usize) -> FrequencyMap {
        FrequencyMap::new(&SpectrumConfig {
            columns,
            ..Default::default()
        })
    }

    #[test]
    fn test_forty_column_scenario() {
        let map = map_with(40);
        let edges = map.edges();

        assert_eq!(edges.len(), 41);
        assert_eq!(edges[0], 18.0);
        assert_eq!(edges[40], 18000.0);
        assert!(edges.windows(2).all(|w| w[1] > w[0]));

        // round(40 * 0.22) = 9 low columns end exactly at the low break
        assert!((edges[9] - 220.0).abs() < 0.5);
    }

    #[test]
    fn test_tiny_column_counts() {
        for n in 1..=4 {
            let map = map_with(n);
            assert_eq!(map.edges().len(), n + 1, "columns = {n}");
            assert_eq!(map.edges()[0], 18.0);
            assert_eq!(map.edges()[n], 18000.0);
            assert!(map.edges().windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn test_mid_break_below_low_break_is_clamped() {
        let map = FrequencyMap::new(&SpectrumConfig {
            low_break_hz: 3000.0,
            mid_break_hz: 100.0,
            ..Default::default()
        });
        assert!(map.mid_end >= map.low_end + 10.0);
        assert!(map.edges().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_hz_to_x_norm_tracks_edges() {
        let map = map_with(40);

        assert_eq!(map.hz_to_x_norm(18.0), 0.0);
        assert!((map.hz_to_x_norm(18000.0) - 1.0).abs() < 1e-6);
        assert!((map.hz_to_x_norm(220.0) - 0.22).abs() < 1e-4);
        assert!((map.hz_to_x_norm(5000.0) - 0.80).abs() < 1e-4);

        // Out of range clamps, NaN reads as the bottom of the range
        assert_eq!(map.hz_to_x_norm(1.0), 0.0);
        assert_eq!(map.hz_to_x_norm(f32::NAN), 0.0);
        assert!((map.hz_to_x_norm(1e9) - 1.0).abs() < 1e-6);

        // Every edge lands within one column of its index
        for (i, &hz) in map.edges().iter().enumerate() {
            let x = map.hz_to_x_norm(hz);
            assert!((x - i as f32 / 40.0).abs() <= 1.0 / 40.0, "edge {i}: {x}");
        }
    }

    #[test]
    fn test_ticks_filtered_to_range() {
        let map = FrequencyMap::new(&SpectrumConfig {
            min_hz: 40.0,
            max_hz: 10000.0,
            ..Default::default()
        });
        assert_eq!(map.ticks(), &[63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0]);
    }

    #[test]
    fn test_column_center_is_geometric_mean() {
        let map = map_with(40);
        let (a, b) = map.column_range(3);
        assert!((map.column_center(3) - (a * b).sqrt()).abs() < 1e-3);
    }
}
