//! Audio engine: the explicitly owned context plus the analysis graph.
//!
//! Lifecycle: [`AudioEngine::new`] → [`AudioEngine::ensure_graph`] (async, resumes
//! the context) → per frame [`AudioEngine::tick`] / [`AudioEngine::read_frame`] →
//! [`AudioEngine::dispose`] (also on drop).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::Arc;

use super::analyser::SpectrumFrame;
use super::graph::{AudioGraph, GainNode};
use super::media::{MediaElement, PlaybackCursor};
use crate::error::EngineError;
use crate::freq_map::FrequencyMap;
use crate::params::AnalyserConfig;

/// Sample rate of a context without an output device
pub const OFFLINE_SAMPLE_RATE: u32 = 48000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// What the output callback plays
struct Route {
    cursor: PlaybackCursor,
    gain: GainNode,
}

struct OutputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    name: String,
}

/// Output context. Offline contexts have no device and their clock is
/// advanced by the frame loop.
pub struct AudioContext {
    state: ContextState,
    sample_rate: u32,
    output: Option<OutputDevice>,
    stream: Option<cpal::Stream>,
    route: Arc<Mutex<Option<Route>>>,
}

impl AudioContext {
    /// Open the default output device
    pub fn new() -> Result<Self, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EngineError::Unsupported("no audio output device found".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::Unsupported(format!("no usable output config: {}", e)))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let sample_rate = config.sample_rate().0;

        Ok(Self {
            state: ContextState::Suspended,
            sample_rate,
            output: Some(OutputDevice {
                device,
                config: config.into(),
                name,
            }),
            stream: None,
            route: Arc::new(Mutex::new(None)),
        })
    }

    pub fn offline(sample_rate: u32) -> Self {
        Self {
            state: ContextState::Suspended,
            sample_rate: sample_rate.max(1),
            output: None,
            stream: None,
            route: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_offline(&self) -> bool {
        self.output.is_none()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Start the output stream. Until this completes the analyser reads silence.
    pub async fn resume(&mut self) -> Result<(), EngineError> {
        match self.state {
            ContextState::Running => return Ok(()),
            ContextState::Closed => {
                return Err(EngineError::Playback("audio context is closed".into()))
            }
            ContextState::Suspended => {}
        }

        if let Some(output) = &self.output {
            if self.stream.is_none() {
                self.stream = Some(build_stream(output, Arc::clone(&self.route))?);
            }
            if let Some(stream) = &self.stream {
                stream
                    .play()
                    .map_err(|e| EngineError::Playback(format!("failed to start stream: {}", e)))?;
            }
            tracing::info!("Audio: {} @ {}Hz", output.name, self.sample_rate);
        }

        self.state = ContextState::Running;
        Ok(())
    }

    pub fn suspend(&mut self) {
        if self.state != ContextState::Running {
            return;
        }
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::warn!("Failed to pause output stream: {}", e);
            }
        }
        self.state = ContextState::Suspended;
    }

    fn connect(&self, cursor: PlaybackCursor, gain: GainNode) {
        *self.route.lock() = Some(Route { cursor, gain });
    }

    fn disconnect(&self) {
        *self.route.lock() = None;
    }

    /// Release the output device
    pub fn close(&mut self) {
        if self.state == ContextState::Closed {
            return;
        }
        self.disconnect();
        self.stream = None;
        self.state = ContextState::Closed;
        tracing::debug!("Audio context closed");
    }
}

fn build_stream(
    output: &OutputDevice,
    route: Arc<Mutex<Option<Route>>>,
) -> Result<cpal::Stream, EngineError> {
    let channels = output.config.channels as usize;
    let sample_rate = output.config.sample_rate.0;

    output
        .device
        .build_output_stream(
            &output.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Never block the audio thread on the route swap
                let Some(route) = route.try_lock() else {
                    data.fill(0.0);
                    return;
                };
                match route.as_ref() {
                    Some(r) => r
                        .cursor
                        .render(data, channels, sample_rate, r.gain.sampler(sample_rate)),
                    None => data.fill(0.0),
                }
            },
            |err| tracing::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| EngineError::Unsupported(format!("failed to build output stream: {}", e)))
}

/// Owner of the audio context and the analysis graph
pub struct AudioEngine {
    config: AnalyserConfig,
    context: Option<AudioContext>,
    graph: Option<AudioGraph>,
    force_offline: bool,
}

impl AudioEngine {
    /// Engine that plays through the default output device when one exists
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            config,
            context: None,
            graph: None,
            force_offline: false,
        }
    }

    /// Engine that never opens a device (recording, tests)
    pub fn offline(config: AnalyserConfig) -> Self {
        let mut engine = Self::new(config);
        engine.force_offline = true;
        engine
    }

    /// Build the analysis graph for `element`, creating and resuming the
    /// context first if needed.
    ///
    /// Idempotent for the same element. A different element replaces the
    /// existing graph. Binding an element that some other graph already
    /// wrapped fails with [`EngineError::GraphAlreadyBound`].
    pub async fn ensure_graph(
        &mut self,
        element: &MediaElement,
        map: &FrequencyMap,
    ) -> Result<(), EngineError> {
        if self
            .context
            .as_ref()
            .map_or(true, |c| c.state() == ContextState::Closed)
        {
            self.context = Some(self.create_context());
        }

        if let Some(context) = self.context.as_mut() {
            if let Err(e) = context.resume().await {
                tracing::warn!("{}; continuing without audio output", e);
                let mut offline = AudioContext::offline(context.sample_rate());
                offline.resume().await?;
                *context = offline;
            }
        }

        let track_rate = element.cursor().track().map(|t| t.sample_rate());

        if let Some(graph) = self.graph.as_mut() {
            if graph.element_id() == element.id() {
                // Same element; only a new track rate needs fresh bin tables
                if let Some(rate) = track_rate.filter(|&r| r != graph.sample_rate()) {
                    graph.retune(map, rate);
                }
                return Ok(());
            }
        }
        self.release_graph();

        let cursor = element.bind_source()?;
        let sample_rate = track_rate
            .or_else(|| self.context.as_ref().map(|c| c.sample_rate()))
            .unwrap_or(OFFLINE_SAMPLE_RATE);

        let graph = AudioGraph::build(cursor.clone(), &self.config, map, sample_rate);
        if let Some(context) = &self.context {
            context.connect(cursor, graph.gain().clone());
        }
        self.graph = Some(graph);
        Ok(())
    }

    fn create_context(&self) -> AudioContext {
        if self.force_offline {
            return AudioContext::offline(OFFLINE_SAMPLE_RATE);
        }
        match AudioContext::new() {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("{}; running offline", e);
                AudioContext::offline(OFFLINE_SAMPLE_RATE)
            }
        }
    }

    pub fn graph(&self) -> Option<&AudioGraph> {
        self.graph.as_ref()
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|c| c.state() == ContextState::Running)
    }

    /// True when nothing but the frame loop advances the playback clock
    pub fn is_offline(&self) -> bool {
        self.context.as_ref().map_or(true, |c| c.is_offline())
    }

    pub fn volume(&self) -> f32 {
        self.graph
            .as_ref()
            .map_or(self.config.volume, |g| g.gain().target())
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.config.volume = volume.clamp(0.0, 1.0);
        if let Some(graph) = &self.graph {
            graph.gain().set_target(volume);
        }
    }

    /// Idle the output stream while nothing plays; the next
    /// [`ensure_graph`](Self::ensure_graph) resumes it
    pub fn suspend(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.suspend();
        }
    }

    /// Per-frame clock work for offline contexts
    pub fn tick(&mut self, element: &mut MediaElement, dt_s: f32) {
        if !self.is_offline() || !self.is_running() {
            return;
        }
        element.advance(dt_s as f64);
        if let Some(graph) = &self.graph {
            graph.gain().step(dt_s);
        }
    }

    /// Take this frame's analyser snapshot (once per frame)
    pub fn read_frame(&mut self) -> Option<&SpectrumFrame> {
        let running = self.is_running();
        let graph = self.graph.as_mut()?;
        if !graph.is_connected() {
            return None;
        }
        Some(graph.read(running))
    }

    fn release_graph(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            graph.disconnect();
            if let Some(context) = &self.context {
                context.disconnect();
            }
        }
    }

    /// Disconnect the graph and close the context
    pub fn dispose(&mut self) {
        self.release_graph();
        if let Some(mut context) = self.context.take() {
            context.close();
            tracing::info!("Audio engine disposed");
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}
