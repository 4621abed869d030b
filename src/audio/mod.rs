//! Audio input and analysis: media element, analysis graph, features and beats.

mod analyser;
mod bands;
mod beat;
mod demo;
mod engine;
mod graph;
mod media;

pub use analyser::{Analyser, SpectrumFrame};
pub use bands::{band_energy, compute_columns, BandEnergies, FeatureExtractor, FrameFeatures};
pub use beat::{BeatDetector, BeatFrame};
pub use demo::{render_demo, DEMO_SECONDS};
pub use engine::{AudioContext, AudioEngine, ContextState, OFFLINE_SAMPLE_RATE};
pub use graph::{column_bins, AudioGraph, GainNode, NodeId};
pub use media::{MediaElement, MediaEvent, PlaybackCursor, Subscription, Track};
