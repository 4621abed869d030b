//! Analysis graph: source → gain → analyser → destination.
//!
//! Built once per media element. Besides the nodes it owns the column to bin
//! tables and the scratch buffers, so the per-frame read allocates nothing.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use super::analyser::{Analyser, SpectrumFrame};
use super::media::PlaybackCursor;
use crate::freq_map::FrequencyMap;
use crate::params::AnalyserConfig;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct SourceNode {
    pub id: NodeId,
    cursor: PlaybackCursor,
}

impl SourceNode {
    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }
}

/// Output gain with a smoothed approach to its target.
///
/// Shared with the audio thread through atomics (f32 bits).
#[derive(Clone)]
pub struct GainNode {
    pub id: NodeId,
    target: Arc<AtomicU32>,
    current: Arc<AtomicU32>,
    ramp_s: f32,
}

impl GainNode {
    fn new(value: f32, ramp_s: f32) -> Self {
        let value = value.clamp(0.0, 1.0);
        Self {
            id: NodeId::next(),
            target: Arc::new(AtomicU32::new(value.to_bits())),
            current: Arc::new(AtomicU32::new(value.to_bits())),
            ramp_s: ramp_s.max(1e-4),
        }
    }

    pub fn set_target(&self, value: f32) {
        let v = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.target.store(v.to_bits(), Ordering::Release);
    }

    pub fn target(&self) -> f32 {
        f32::from_bits(self.target.load(Ordering::Acquire))
    }

    pub fn value(&self) -> f32 {
        f32::from_bits(self.current.load(Ordering::Acquire))
    }

    /// Move the current gain toward the target over `dt_s`
    pub fn step(&self, dt_s: f32) -> f32 {
        let target = self.target();
        let cur = self.value();
        let k = 1.0 - (-dt_s.max(0.0) / self.ramp_s).exp();
        let next = cur + (target - cur) * k;
        self.current.store(next.to_bits(), Ordering::Release);
        next
    }

    /// Per-sample stepper for an output callback at `sample_rate`
    pub fn sampler(&self, sample_rate: u32) -> impl FnMut() -> f32 + '_ {
        let target = self.target();
        let k = 1.0 - (-1.0 / (sample_rate.max(1) as f32 * self.ramp_s)).exp();
        let mut cur = self.value();
        move || {
            cur += (target - cur) * k;
            self.current.store(cur.to_bits(), Ordering::Relaxed);
            cur
        }
    }
}

pub struct AnalyserNode {
    pub id: NodeId,
    analyser: Analyser,
    window: Vec<f32>,
}

/// Connected analysis chain for one media element
pub struct AudioGraph {
    source: SourceNode,
    gain: GainNode,
    analyser: AnalyserNode,
    connected: bool,
    sample_rate: u32,
    bin_ranges: Vec<Range<usize>>,
    centers: Vec<f32>,
    frame: SpectrumFrame,
}

impl AudioGraph {
    /// Wire the nodes and derive the column tables for `map`
    pub fn build(
        cursor: PlaybackCursor,
        config: &AnalyserConfig,
        map: &FrequencyMap,
        sample_rate: u32,
    ) -> Self {
        let analyser = Analyser::new(config);
        let fft_size = analyser.fft_size();
        let (bin_ranges, centers) = column_bins(map.edges(), sample_rate, analyser.bin_count());

        tracing::debug!(
            "Analysis graph for element {}: fft {}, {} columns @ {} Hz",
            cursor.element_id(),
            fft_size,
            bin_ranges.len(),
            sample_rate
        );

        Self {
            source: SourceNode {
                id: NodeId::next(),
                cursor,
            },
            gain: GainNode::new(config.volume, config.volume_ramp_s),
            analyser: AnalyserNode {
                id: NodeId::next(),
                analyser,
                window: vec![0.0; fft_size],
            },
            connected: true,
            sample_rate,
            bin_ranges,
            centers,
            frame: SpectrumFrame::new(fft_size),
        }
    }

    pub fn element_id(&self) -> u64 {
        self.source.cursor.element_id()
    }

    /// Source, gain and analyser identities
    pub fn node_ids(&self) -> [NodeId; 3] {
        [self.source.id, self.gain.id, self.analyser.id]
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn source(&self) -> &SourceNode {
        &self.source
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bin_count(&self) -> usize {
        self.frame.bin_count()
    }

    pub fn bin_ranges(&self) -> &[Range<usize>] {
        &self.bin_ranges
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    /// Latest snapshot without taking a new one
    pub fn frame(&self) -> &SpectrumFrame {
        &self.frame
    }

    /// Take this frame's snapshot. `running` is false while the context is
    /// suspended, in which case the analyser sees silence.
    pub fn read(&mut self, running: bool) -> &SpectrumFrame {
        let window = &mut self.analyser.window;
        if self.connected && running && self.source.cursor.is_playing() {
            self.source.cursor.window(window);
            let g = self.gain.value();
            window.iter_mut().for_each(|s| *s *= g);
        } else {
            window.fill(0.0);
        }
        self.analyser.analyser.process(window, &mut self.frame);
        &self.frame
    }

    /// Recompute the column tables after the source sample rate changed
    pub fn retune(&mut self, map: &FrequencyMap, sample_rate: u32) {
        let (ranges, centers) = column_bins(map.edges(), sample_rate, self.bin_count());
        tracing::debug!(
            "Retuning graph for element {}: {} -> {} Hz",
            self.element_id(),
            self.sample_rate,
            sample_rate
        );
        self.bin_ranges = ranges;
        self.centers = centers;
        self.sample_rate = sample_rate;
        self.analyser.analyser.reset();
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            tracing::debug!("Disconnecting graph for element {}", self.element_id());
        }
        self.connected = false;
        self.frame.clear();
        self.analyser.analyser.reset();
    }
}

/// Bin range and centre frequency of every column.
///
/// Ranges are clamped non-empty; neighbouring columns may share a bin at
/// low frequencies where columns are narrower than a bin.
pub fn column_bins(
    edges: &[f32],
    sample_rate: u32,
    bin_count: usize,
) -> (Vec<Range<usize>>, Vec<f32>) {
    if edges.len() < 2 || sample_rate == 0 || bin_count == 0 {
        return (Vec::new(), Vec::new());
    }
    let ny = sample_rate as f32 / 2.0;
    let n = bin_count;

    edges
        .windows(2)
        .map(|w| {
            let (hz0, hz1) = (w[0], w[1]);
            let start = ((hz0 / ny * n as f32).floor().max(0.0) as usize).min(n - 1);
            let end = ((hz1 / ny * n as f32).ceil() as usize).clamp(start + 1, n);
            (start..end, (hz0 * hz1).sqrt())
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::media::{MediaElement, Track};
    use crate::params::SpectrumConfig;

    #[test]
    fn test_column_bins_cover_and_stay_in_range() {
        let map = FrequencyMap::new(&SpectrumConfig::default());
        let (ranges, centers) = column_bins(map.edges(), 48000, 8192);

        assert_eq!(ranges.len(), 40);
        assert_eq!(centers.len(), 40);
        for (r, w) in ranges.iter().zip(map.edges().windows(2)) {
            assert!(r.start < r.end);
            assert!(r.end <= 8192);
            let c = (w[0] * w[1]).sqrt();
            assert!(c > w[0] && c < w[1]);
        }
        // No gaps between columns
        for pair in ranges.windows(2) {
            assert!(pair[1].start <= pair[0].end);
        }
    }

    #[test]
    fn test_column_bins_degenerate_inputs() {
        let (r, c) = column_bins(&[18.0, 18000.0], 0, 8192);
        assert!(r.is_empty() && c.is_empty());
        let (r, _) = column_bins(&[18.0, 18000.0], 48000, 0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_paused_source_reads_silence() {
        let element = MediaElement::with_track(Track::from_samples(vec![0.5; 48000], 48000, 1));
        let map = FrequencyMap::new(&SpectrumConfig::default());
        let config = AnalyserConfig {
            fft_size: 2048,
            ..Default::default()
        };
        let mut graph = AudioGraph::build(element.cursor(), &config, &map, 48000);

        let frame = graph.read(true);
        assert!(frame.freq.iter().all(|&b| b == 0));
        assert_eq!(graph.bin_count(), 1024);
    }

    #[test]
    fn test_gain_ramps_toward_target() {
        let gain = GainNode::new(0.0, 0.03);
        gain.set_target(1.0);
        gain.step(0.03);
        assert!((gain.value() - (1.0 - (-1.0f32).exp())).abs() < 1e-5);

        for _ in 0..50 {
            gain.step(0.01);
        }
        assert!((gain.value() - 1.0).abs() < 1e-3);

        gain.set_target(f32::NAN);
        assert_eq!(gain.target(), 0.0);
    }
}
