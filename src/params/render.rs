//! Window, frame loop and recording configuration.

use serde::{Deserialize, Serialize};

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (logical pixels)
    pub window_width: u32,

    /// Window height (logical pixels)
    pub window_height: u32,

    /// Share of the window height given to the scene canvas (top);
    /// the spectrum canvas takes the rest
    pub scene_fraction: f32,

    /// Largest frame delta fed to the simulation (seconds)
    pub max_dt_s: f32,

    /// Smallest frame delta fed to the simulation (seconds)
    pub min_dt_s: f32,

    /// Seed for star layout, background pixels and particles
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            scene_fraction: 224.0 / 480.0,
            max_dt_s: 0.05,
            min_dt_s: 0.001,
            seed: 0x5eed_cafe,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height as f32
    }

    /// Clamp a raw frame delta into the integrable range
    pub fn clamp_dt(&self, raw_s: f32) -> f32 {
        if !raw_s.is_finite() {
            return self.max_dt_s;
        }
        raw_s.clamp(self.min_dt_s, self.max_dt_s)
    }
}

/// Offline recording configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Duration to record (seconds)
    pub duration_secs: f32,

    /// Output directory for frames
    pub output_dir: String,

    /// Frame rate (FPS)
    pub fps: u32,

    /// Output size (CSS pixels)
    pub width: u32,
    pub height: u32,

    /// Device pixel ratio applied to the output
    pub dpr: f32,
}

impl RecordingConfig {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            duration_secs,
            output_dir: "recording".to_string(),
            fps: 60,
            width: 960,
            height: 480,
            dpr: 1.0,
        }
    }

    /// Total number of frames to capture
    pub fn total_frames(&self) -> usize {
        (self.duration_secs.max(0.0) * self.fps as f32).ceil() as usize
    }

    /// Frame directory path
    pub fn frames_dir(&self) -> String {
        format!("{}/frames", self.output_dir)
    }

    /// Path of a numbered frame
    pub fn frame_path(&self, frame_num: usize) -> String {
        format!("{}/frame_{:05}.png", self.frames_dir(), frame_num)
    }
}
