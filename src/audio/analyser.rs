//! Spectral analyser producing byte-scaled magnitude snapshots.
//!
//! Blackman window, forward FFT, magnitude / N, temporal smoothing and a
//! linear dB-to-byte map. The smoothed magnitudes persist between snapshots,
//! so reading once per frame matters: every read is a smoothing step.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::params::AnalyserConfig;

/// Per-frame analyser output, overwritten in place
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    /// Frequency magnitudes, `fft_size / 2` bytes
    pub freq: Vec<u8>,

    /// Time-domain samples, `fft_size` bytes centred on 128
    pub time: Vec<u8>,
}

impl SpectrumFrame {
    pub fn new(fft_size: usize) -> Self {
        Self {
            freq: vec![0; fft_size / 2],
            time: vec![128; fft_size],
        }
    }

    pub fn bin_count(&self) -> usize {
        self.freq.len()
    }

    pub fn clear(&mut self) {
        self.freq.fill(0);
        self.time.fill(128);
    }
}

/// FFT analyser with smoothing state
pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new(config: &AnalyserConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft_size,
            smoothing: config.smoothing.clamp(0.0, 0.999),
            min_db: config.min_db,
            max_db: config.max_db,
            fft,
            window: blackman(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse `samples` (the latest `fft_size` mono samples, gain applied)
    pub fn process(&mut self, samples: &[f32], frame: &mut SpectrumFrame) {
        let n = self.fft_size;

        for (i, c) in self.buffer.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            let s = if s.is_finite() { s } else { 0.0 };
            *c = Complex::new(s * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let tau = self.smoothing;
        let inv_n = 1.0 / n as f32;
        let span = (self.max_db - self.min_db).max(1e-6);

        frame.freq.resize(n / 2, 0);
        for (k, byte) in frame.freq.iter_mut().enumerate() {
            let mag = self.buffer[k].norm() * inv_n;
            let x = tau * self.smoothed[k] + (1.0 - tau) * mag;
            self.smoothed[k] = x;

            let db = 20.0 * x.max(1e-12).log10();
            let scaled = 255.0 * (db - self.min_db) / span;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }

        frame.time.resize(n, 128);
        for (i, byte) in frame.time.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *byte = (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8;
        }
    }

    /// Forget the smoothing history
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

/// Blackman window (alpha = 0.16)
fn blackman(n: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..n)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / n as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
