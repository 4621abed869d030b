//! Per-frame feature extraction: column levels, star bands and broad band energies.

use std::ops::Range;

use super::graph::AudioGraph;
use crate::envelope::Envelope;
use crate::params::BandConfig;

/// Broad band energies in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergies {
    pub bass: f32,
    pub mids: f32,
    pub air: f32,
}

/// Snapshot published once per frame and read by every renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameFeatures {
    /// Raw column levels for the bar display (empty while offline)
    pub columns: Vec<f32>,

    /// Slowly smoothed column levels driving the stars
    pub star_bands: Vec<f32>,

    pub bands: BandEnergies,

    /// True when an analyser snapshot was available this frame
    pub live: bool,
}

/// Max-in-range column levels with perceptual shaping and a 3-tap blur.
///
/// Returns `None` when there are no ranges or `centers` does not match.
pub fn compute_columns<'a>(
    freq: &[u8],
    ranges: &[Range<usize>],
    centers: &[f32],
    out: &'a mut Vec<f32>,
) -> Option<&'a [f32]> {
    let cols = ranges.len();
    if cols == 0 || centers.len() != cols {
        return None;
    }
    out.resize(cols, 0.0);

    for ((level, range), &center) in out.iter_mut().zip(ranges).zip(centers) {
        let m = freq
            .get(range.clone())
            .unwrap_or(&[])
            .iter()
            .map(|&v| v as f32 / 255.0)
            .fold(0.0f32, f32::max);

        let comp = (center.max(0.0) / 1200.0).powf(0.06).clamp(0.9, 1.18);
        *level = (m.powf(1.35) * comp).clamp(0.0, 1.0);
    }

    // In place: left neighbour is already blurred, as the display always did
    for i in 0..cols {
        let a = out[i];
        let l = if i > 0 { out[i - 1] } else { a };
        let r = if i + 1 < cols { out[i + 1] } else { a };
        out[i] = (l * 0.18 + a * 0.64 + r * 0.18).clamp(0.0, 1.0);
    }

    Some(out.as_slice())
}

/// RMS of normalized magnitudes between `hz0` and `hz1`, raised to 0.95.
///
/// Zero when the graph is not ready (no sample rate or no bins).
pub fn band_energy(freq: &[u8], sample_rate: u32, bin_count: usize, hz0: f32, hz1: f32) -> f32 {
    if sample_rate == 0 || bin_count == 0 {
        return 0.0;
    }
    let ny = sample_rate as f32 / 2.0;
    let n = bin_count;

    let s = ((hz0 / ny * n as f32).floor().max(0.0) as usize).min(n - 1);
    let e = ((hz1 / ny * n as f32).ceil().max(0.0) as usize).clamp(s + 1, n);

    let acc: f32 = (s..e)
        .map(|i| {
            let v = freq.get(i).copied().unwrap_or(0) as f32 / 255.0;
            v * v
        })
        .sum();
    let rms = (acc / (e - s) as f32).sqrt();
    rms.powf(0.95).clamp(0.0, 1.0)
}

/// Owns the per-column star envelopes and the published snapshot
pub struct FeatureExtractor {
    config: BandConfig,
    raw: Vec<f32>,
    star_env: Vec<Envelope>,
    features: FrameFeatures,
}

impl FeatureExtractor {
    pub fn new(config: BandConfig, columns: usize) -> Self {
        let env = Envelope::per_frame(config.star_attack, config.star_release);
        Self {
            config,
            raw: Vec::with_capacity(columns),
            star_env: vec![env; columns],
            features: FrameFeatures {
                columns: Vec::with_capacity(columns),
                star_bands: vec![0.0; columns],
                ..Default::default()
            },
        }
    }

    pub fn features(&self) -> &FrameFeatures {
        &self.features
    }

    /// Turn this frame's snapshot into features.
    ///
    /// `graph` is `None` until the analysis graph exists; then bands read zero
    /// and the star bands hold their last values.
    pub fn extract(&mut self, graph: Option<&AudioGraph>) -> &FrameFeatures {
        let f = &mut self.features;
        f.columns.clear();

        let Some(graph) = graph.filter(|g| g.is_connected()) else {
            f.bands = BandEnergies::default();
            f.live = false;
            return &self.features;
        };

        let frame = graph.frame();
        let sr = graph.sample_rate();
        let bins = graph.bin_count();
        let c = &self.config;
        f.bands = BandEnergies {
            bass: band_energy(&frame.freq, sr, bins, c.bass_hz.0, c.bass_hz.1),
            mids: band_energy(&frame.freq, sr, bins, c.mids_hz.0, c.mids_hz.1),
            air: band_energy(&frame.freq, sr, bins, c.air_hz.0, c.air_hz.1),
        };
        f.live = true;

        if let Some(levels) =
            compute_columns(&frame.freq, graph.bin_ranges(), graph.centers(), &mut self.raw)
        {
            f.columns.extend_from_slice(levels);

            let n = levels.len().min(self.star_env.len());
            f.star_bands.resize(self.star_env.len(), 0.0);
            for i in 0..n {
                // dt is unused by per-frame envelopes
                f.star_bands[i] = self.star_env[i].update(levels[i], 0.0);
            }
        }

        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_energy_zero_input_safety() {
        let freq = vec![255u8; 1024];
        assert_eq!(band_energy(&freq, 0, 1024, 35.0, 180.0), 0.0);
        assert_eq!(band_energy(&freq, 48000, 0, 35.0, 180.0), 0.0);
        assert_eq!(band_energy(&[], 48000, 1024, 35.0, 180.0), 0.0);
    }

    #[test]
    fn test_band_energy_full_scale() {
        let freq = vec![255u8; 1024];
        assert!((band_energy(&freq, 48000, 1024, 35.0, 180.0) - 1.0).abs() < 1e-6);

        let half = vec![128u8; 1024];
        let e = band_energy(&half, 48000, 1024, 250.0, 2600.0);
        assert!((e - (128.0f32 / 255.0).powf(0.95)).abs() < 1e-5);
    }

    #[test]
    fn test_band_energy_range_never_empty() {
        // hz0 beyond Nyquist still reads the last bin
        let mut freq = vec![0u8; 16];
        freq[15] = 255;
        assert!(band_energy(&freq, 1000, 16, 900.0, 950.0) > 0.99);
    }

    #[test]
    fn test_compute_columns_rejects_mismatch() {
        let freq = vec![200u8; 64];
        let mut out = Vec::new();
        assert!(compute_columns(&freq, &[], &[], &mut out).is_none());
        assert!(compute_columns(&freq, &[0..4, 4..8], &[100.0], &mut out).is_none());
    }

    #[test]
    fn test_compute_columns_takes_max_and_blurs() {
        let mut freq = vec![0u8; 30];
        freq[12] = 255; // single peak inside column 1
        let ranges = vec![0..10, 10..20, 20..30];
        let centers = vec![1200.0; 3]; // comp = 1
        let mut out = Vec::new();

        let cols = compute_columns(&freq, &ranges, &centers, &mut out).unwrap();

        // Column 0 reads its own 0 plus 0.18 of column 1
        assert!((cols[0] - 0.18).abs() < 1e-5);
        // Column 1: 0.18 * blurred col 0 + 0.64 * 1 + 0.18 * 0
        assert!((cols[1] - (0.18 * 0.18 + 0.64)).abs() < 1e-5);
        assert!(cols.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_compute_columns_frequency_compensation() {
        let freq = vec![128u8; 20];
        let ranges = vec![0..10, 10..20];
        let mut low = Vec::new();
        let mut ref_ = Vec::new();
        compute_columns(&freq, &ranges, &[20.0, 20.0], &mut low).unwrap();
        compute_columns(&freq, &ranges, &[1200.0, 1200.0], &mut ref_).unwrap();

        // Very low centres clamp to 0.9 gain
        assert!((low[0] / ref_[0] - 0.9).abs() < 1e-4);
    }

    #[test]
    fn test_extract_without_graph_is_neutral() {
        let mut extractor = FeatureExtractor::new(BandConfig::default(), 40);
        let f = extractor.extract(None);
        assert!(!f.live);
        assert!(f.columns.is_empty());
        assert_eq!(f.star_bands.len(), 40);
        assert_eq!(f.bands, BandEnergies::default());
    }
}
