//! eqwalker - audio-reactive spectrum display and procedural walker
//!
//! A music track drives two canvases: a segmented column spectrum with a Hz
//! axis, and a night scene where a line-drawn walker paces the ground under
//! stars that pulse with the frequency columns they were assigned to.

pub mod app;
pub mod audio;
pub mod cli;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod freq_map;
pub mod logging;
pub mod math;
pub mod params;
pub mod present;
pub mod record;
pub mod render;
pub mod scene;

pub use error::EngineError;
