//! Command-line argument parsing.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::audio::{render_demo, Track, DEMO_SECONDS, OFFLINE_SAMPLE_RATE};
use crate::error::EngineError;
use crate::params::{EqConfig, RecordingConfig, StillConfig};
use crate::render::{PosePreset, StillParams};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "eqwalker", version)]
#[command(about = "Audio-reactive spectrum display and procedural walker", long_about = None)]
pub struct Args {
    /// Configuration file (TOML); missing keys take their defaults
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the live window (default)
    Play {
        /// WAV file to play; the built-in demo track when omitted
        file: Option<PathBuf>,

        /// Output volume in [0, 1]
        #[arg(long, value_name = "V")]
        volume: Option<f32>,
    },

    /// Render frames to PNG without a window
    Record {
        /// WAV file to render; the built-in demo track when omitted
        file: Option<PathBuf>,

        /// Duration to record (seconds)
        #[arg(long, value_name = "SECONDS")]
        seconds: f32,

        /// Output directory; frames land in <DIR>/frames
        #[arg(long, value_name = "DIR", default_value = "recording")]
        out: String,

        /// Output width (CSS pixels)
        #[arg(long, default_value_t = 960)]
        width: u32,

        /// Output height (CSS pixels)
        #[arg(long, default_value_t = 480)]
        height: u32,

        /// Device pixel ratio
        #[arg(long, default_value_t = 1.0)]
        dpr: f32,

        /// Frame rate
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },

    /// Export a still walker as PNG
    Still {
        #[arg(long, value_enum, default_value_t = PosePreset::ThreeQuarter)]
        preset: PosePreset,

        /// Canvas size (CSS pixels, exported at 2x)
        #[arg(long, value_name = "PX", default_value_t = 420)]
        size: u32,

        #[arg(long, value_name = "FILE", default_value = "walker.png")]
        out: PathBuf,

        /// Leave the backdrop transparent
        #[arg(long)]
        transparent: bool,

        /// Placement jitter seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Rig scale; overrides `[still] scale`
        #[arg(long)]
        scale: Option<f32>,

        /// Walk intensity in [0, 1]
        #[arg(long)]
        motion: Option<f32>,

        /// Gait phase (radians)
        #[arg(long)]
        phase: Option<f32>,

        /// Travel direction, 1 or -1
        #[arg(long, allow_negative_numbers = true)]
        walk_dir: Option<f32>,

        #[arg(long, allow_negative_numbers = true)]
        body_yaw: Option<f32>,

        #[arg(long, allow_negative_numbers = true)]
        look_yaw: Option<f32>,

        #[arg(long, allow_negative_numbers = true)]
        look_pitch: Option<f32>,

        /// Scrub lift pose in [0, 1]
        #[arg(long)]
        hang: Option<f32>,

        /// Crouch in [0, 1]
        #[arg(long)]
        crouch: Option<f32>,
    },

    /// Print the effective configuration as TOML
    Config,
}

impl Args {
    /// Subcommand to run; `play` with the demo track when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Play {
            file: None,
            volume: None,
        })
    }

    /// Load `--config`, or the defaults
    pub fn load_config(&self) -> Result<EqConfig, EngineError> {
        match &self.config {
            Some(path) => EqConfig::load(path),
            None => Ok(EqConfig::default()),
        }
    }
}

/// Recording settings for a `record` command
pub fn recording_config(command: &Command) -> Option<RecordingConfig> {
    match command {
        Command::Record {
            seconds,
            out,
            width,
            height,
            dpr,
            fps,
            ..
        } => Some(RecordingConfig {
            output_dir: out.clone(),
            fps: *fps,
            width: *width,
            height: *height,
            dpr: *dpr,
            ..RecordingConfig::new(*seconds)
        }),
        _ => None,
    }
}

/// Still parameters for a `still` command: the `[still]` section with the
/// command-line flags on top
pub fn still_params(
    command: &Command,
    config: &StillConfig,
) -> Result<Option<StillParams>, EngineError> {
    let Command::Still {
        preset,
        transparent,
        seed,
        scale,
        motion,
        phase,
        walk_dir,
        body_yaw,
        look_yaw,
        look_pitch,
        hang,
        crouch,
        ..
    } = command
    else {
        return Ok(None);
    };

    let mut merged = config.clone();
    merged.scale = scale.unwrap_or(merged.scale);
    merged.motion = motion.unwrap_or(merged.motion);
    merged.phase = phase.unwrap_or(merged.phase);
    merged.walk_dir = walk_dir.unwrap_or(merged.walk_dir);
    merged.body_yaw = body_yaw.or(merged.body_yaw);
    merged.look_yaw = look_yaw.or(merged.look_yaw);
    merged.look_pitch = look_pitch.or(merged.look_pitch);
    merged.hang = hang.unwrap_or(merged.hang);
    merged.crouch = crouch.unwrap_or(merged.crouch);
    merged.validate().map_err(EngineError::Config)?;

    Ok(Some(StillParams {
        transparent: *transparent,
        seed: *seed,
        ..StillParams::from_config(*preset, &merged)
    }))
}

/// Decode `file`, or synthesize the demo track
pub fn load_track(file: Option<&Path>) -> Result<Track, EngineError> {
    match file {
        Some(path) => {
            let track = Track::from_wav(path)?;
            tracing::info!(
                "Loaded {} ({:.1}s, {} Hz, {} ch)",
                path.display(),
                track.duration(),
                track.sample_rate(),
                track.channels()
            );
            Ok(track)
        }
        None => render_demo(OFFLINE_SAMPLE_RATE, DEMO_SECONDS),
    }
}
