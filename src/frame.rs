//! Frame loop driver.
//!
//! One `step` per displayed frame:
//! 1. clamp dt and apply any pending seek
//! 2. advance the playback clock (offline contexts) and deliver media events
//! 3. read the analyser once and publish `FrameFeatures`
//! 4. beat detection, then the scene director
//! 5. redraw the spectrum canvas and the scene canvas
//!
//! Both canvases are sized in device pixels, `round(css * dpr)`, and follow
//! resizes and scale-factor changes without restarting anything.

use crate::audio::{
    AudioEngine, BeatDetector, BeatFrame, FeatureExtractor, FrameFeatures, MediaElement,
    MediaEvent, Subscription, OFFLINE_SAMPLE_RATE,
};
use crate::error::EngineError;
use crate::freq_map::FrequencyMap;
use crate::math::{clamp01, finite_or};
use crate::params::EqConfig;
use crate::render::{Canvas, PixmapCanvas, SceneInputs, SceneRenderer, SpectrumRenderer};
use crate::scene::{DirectorInput, InputCells, SceneDirector, SceneFrame};

/// Backing-store size for a CSS length at a device pixel ratio
pub fn backing_size(css: f32, dpr: f32) -> u32 {
    let px = (finite_or(css, 0.0) * finite_or(dpr, 1.0).max(0.1)).round();
    px.max(1.0) as u32
}

/// The two drawing surfaces, stacked vertically: scene on top, spectrum below
pub struct Surfaces {
    pub scene: PixmapCanvas,
    pub spectrum: PixmapCanvas,
    css: (f32, f32),
    dpr: f32,
    scene_fraction: f32,
}

impl Surfaces {
    pub fn new(css_w: f32, css_h: f32, dpr: f32, scene_fraction: f32) -> Result<Self, EngineError> {
        let mut surfaces = Self {
            scene: PixmapCanvas::new(1, 1)?,
            spectrum: PixmapCanvas::new(1, 1)?,
            css: (0.0, 0.0),
            dpr: 0.0,
            scene_fraction: clamp01(scene_fraction),
        };
        surfaces.resize(css_w, css_h, dpr);
        Ok(surfaces)
    }

    /// CSS heights of the scene and spectrum areas
    pub fn split(&self) -> (f32, f32) {
        let total = self.css.1.max(2.0);
        let scene = (total * self.scene_fraction).round().clamp(1.0, total - 1.0);
        (scene, total - scene)
    }

    pub fn dpr(&self) -> f32 {
        self.dpr
    }

    pub fn css_size(&self) -> (f32, f32) {
        self.css
    }

    /// Track a new window size or scale factor. Returns true when either
    /// backing store was reallocated.
    pub fn resize(&mut self, css_w: f32, css_h: f32, dpr: f32) -> bool {
        self.css = (finite_or(css_w, 1.0).max(1.0), finite_or(css_h, 2.0).max(2.0));
        self.dpr = finite_or(dpr, 1.0).max(0.1);

        let (scene_h, spectrum_h) = self.split();
        let w = backing_size(self.css.0, self.dpr);
        let a = self.scene.resize(w, backing_size(scene_h, self.dpr));
        let b = self.spectrum.resize(w, backing_size(spectrum_h, self.dpr));
        if a || b {
            tracing::debug!(
                "Surfaces resized: scene {}x{}, spectrum {}x{} @ {:.2}x",
                self.scene.width(),
                self.scene.height(),
                self.spectrum.width(),
                self.spectrum.height(),
                self.dpr
            );
        }
        a || b
    }
}

/// Every piece of per-frame state, owned in one place
pub struct RenderState {
    pub map: FrequencyMap,
    pub extractor: FeatureExtractor,
    pub beat: BeatDetector,
    pub director: SceneDirector,
    pub spectrum: SpectrumRenderer,
    pub scene: SceneRenderer,
    pub input: InputCells,
}

impl RenderState {
    pub fn new(config: &EqConfig) -> Self {
        let map = FrequencyMap::new(&config.spectrum);
        Self {
            extractor: FeatureExtractor::new(config.bands.clone(), map.columns()),
            beat: BeatDetector::new(config.beat.clone()),
            director: SceneDirector::new(config.scene.clone(), config.walker.clone()),
            spectrum: SpectrumRenderer::new(config.spectrum.clone()),
            scene: SceneRenderer::new(
                config.stars.clone(),
                config.ambient.clone(),
                &config.walker,
                config.render.seed,
            ),
            input: InputCells::new(config.walker.seek_velocity_span),
            map,
        }
    }

    pub fn features(&self) -> &FrameFeatures {
        self.extractor.features()
    }

    pub fn beat(&self) -> &BeatFrame {
        self.beat.last()
    }

    pub fn scene_frame(&self) -> &SceneFrame {
        self.director.last()
    }
}

pub struct FrameLoop {
    config: EqConfig,
    engine: AudioEngine,
    element: MediaElement,
    events: Subscription,
    frame_events: Vec<MediaEvent>,
    state: RenderState,
    surfaces: Surfaces,
    t_now: f64,
    frames: u64,
}

impl FrameLoop {
    pub fn new(
        config: EqConfig,
        engine: AudioEngine,
        mut element: MediaElement,
        css_w: f32,
        css_h: f32,
        dpr: f32,
    ) -> Result<Self, EngineError> {
        let surfaces = Surfaces::new(css_w, css_h, dpr, config.render.scene_fraction)?;
        let events = element.subscribe();
        Ok(Self {
            state: RenderState::new(&config),
            config,
            engine,
            element,
            events,
            frame_events: Vec::new(),
            surfaces,
            t_now: 0.0,
            frames: 0,
        })
    }

    pub fn config(&self) -> &EqConfig {
        &self.config
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn element(&self) -> &MediaElement {
        &self.element
    }

    pub fn input_mut(&mut self) -> &mut InputCells {
        &mut self.state.input
    }

    /// Media events delivered during the last step
    pub fn events(&self) -> &[MediaEvent] {
        &self.frame_events
    }

    /// Seconds of simulated wall time
    pub fn t_now(&self) -> f64 {
        self.t_now
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn resize(&mut self, css_w: f32, css_h: f32, dpr: f32) -> bool {
        self.surfaces.resize(css_w, css_h, dpr)
    }

    /// Build the analysis graph for the element (first user gesture)
    pub fn connect(&mut self) -> Result<(), EngineError> {
        pollster::block_on(self.engine.ensure_graph(&self.element, &self.state.map))
    }

    pub fn play(&mut self) -> Result<(), EngineError> {
        self.connect()?;
        let result = self.element.play();
        self.settle(result)
    }

    /// Pause playback and let the output stream idle
    pub fn pause(&mut self) {
        self.element.pause();
        self.engine.suspend();
    }

    pub fn toggle(&mut self) -> Result<(), EngineError> {
        if self.element.paused() {
            self.connect()?;
        }
        let result = self.element.toggle();
        self.settle(result)?;
        if self.element.paused() {
            self.engine.suspend();
        }
        Ok(())
    }

    pub fn seek_by(&mut self, delta_s: f64) {
        let t = self.element.current_time() + delta_s;
        self.element.seek(t);
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.engine.set_volume(volume);
        tracing::debug!("Volume {:.2}", self.engine.volume());
    }

    /// Transient playback failures leave the element paused and the loop running
    fn settle(&mut self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        match result {
            Err(e) if e.is_transient() => {
                tracing::warn!("Playback: {}", e);
                self.pause();
                Ok(())
            }
            other => other,
        }
    }

    /// Advance and redraw one frame
    pub fn step(&mut self, raw_dt_s: f32) {
        let dt = self.config.render.clamp_dt(raw_dt_s);
        self.t_now += dt as f64;
        let t_now = self.t_now as f32;

        if let Some(t) = self.state.input.take_seek() {
            self.element.seek(t);
        }
        self.engine.tick(&mut self.element, dt);
        self.element.update();

        self.frame_events.clear();
        self.frame_events.extend(self.events.try_iter());
        if self.frame_events.contains(&MediaEvent::Ended) {
            self.engine.suspend();
        }
        for event in &self.frame_events {
            match event {
                MediaEvent::Ended => tracing::info!("Track ended"),
                MediaEvent::LoadedMetadata { duration } => {
                    tracing::info!("Track loaded ({:.1}s)", duration)
                }
                _ => {}
            }
        }

        let playing = !self.element.paused();
        let duration = self.element.duration();
        let progress = if duration > 0.0 {
            (self.element.current_time() / duration) as f32
        } else {
            0.0
        };

        // The one analyser read of this frame
        self.engine.read_frame();

        let RenderState {
            map,
            extractor,
            beat,
            director,
            spectrum,
            scene,
            input,
        } = &mut self.state;
        let graph = self.engine.graph().filter(|g| g.is_connected());
        let features = extractor.extract(graph);
        let beat_frame = beat.update(features.bands.bass, playing, dt);

        let dpr = self.surfaces.dpr;
        let scene_frame = director.update(&DirectorInput {
            bands: features.bands,
            kick: beat_frame.kick,
            playing,
            dt,
            t_now,
            width: self.surfaces.scene.width() as f32,
            height: self.surfaces.scene.height() as f32,
            dpr,
            progress,
            pointer: input.pointer,
            seek_held: input.seek_held,
            seek_pull: input.seek_pull,
        });

        let columns = Some(features.columns.as_slice()).filter(|c| features.live && !c.is_empty());
        spectrum.draw(&mut self.surfaces.spectrum, columns, map, dpr);

        scene.draw(
            &mut self.surfaces.scene,
            map.edges(),
            &SceneInputs {
                features,
                beat: &beat_frame,
                scene: &scene_frame,
                freq: graph.map(|g| g.frame().freq.as_slice()),
                sample_rate: graph.map_or(OFFLINE_SAMPLE_RATE, |g| g.sample_rate()),
                playing,
                dt,
                t_now,
                dpr,
            },
        );

        self.frames += 1;
    }

    /// Stop audio and release the graph
    pub fn dispose(&mut self) {
        self.element.pause();
        self.engine.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Track;
    use crate::params::AnalyserConfig;

    fn kick_track(seconds: f32) -> Track {
        let sr = 48000;
        let n = (seconds * sr as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                // 60 Hz thump, twice a second
                let env = (-(t % 0.5) * 12.0).exp();
                (t * 60.0 * std::f32::consts::TAU).sin() * env * 0.8
            })
            .collect();
        Track::from_samples(samples, sr, 1)
    }

    fn frame_loop(track: Option<Track>) -> FrameLoop {
        let element = track.map_or_else(MediaElement::new, MediaElement::with_track);
        FrameLoop::new(
            EqConfig::default(),
            AudioEngine::offline(AnalyserConfig::default()),
            element,
            960.0,
            480.0,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_backing_size() {
        assert_eq!(backing_size(960.0, 1.0), 960);
        assert_eq!(backing_size(100.5, 2.0), 201);
        assert_eq!(backing_size(0.0, 2.0), 1);
        assert_eq!(backing_size(f32::NAN, 2.0), 1);
    }

    #[test]
    fn test_surfaces_split_and_track_dpr() {
        let mut s = Surfaces::new(960.0, 480.0, 1.0, 224.0 / 480.0).unwrap();
        assert_eq!(s.scene.height(), 224);
        assert_eq!(s.spectrum.height(), 256);
        assert_eq!(s.scene.width(), 960);

        assert!(s.resize(960.0, 480.0, 2.0));
        assert_eq!(s.scene.width(), 1920);
        assert_eq!(s.scene.height(), 448);
        assert!(!s.resize(960.0, 480.0, 2.0));
    }

    #[test]
    fn test_silent_loop_draws_offline_spectrum() {
        let mut fl = frame_loop(None);
        for _ in 0..5 {
            fl.step(1.0 / 60.0);
        }
        assert!(!fl.state().features().live);
        assert_eq!(fl.state().scene_frame().visibility, 0.0);
        assert_eq!(fl.frames(), 5);
    }

    #[test]
    fn test_playing_track_reaches_the_scene() {
        let mut fl = frame_loop(Some(kick_track(3.0)));
        fl.play().unwrap();
        assert!(fl.engine().graph().is_some());

        for _ in 0..90 {
            fl.step(1.0 / 60.0);
        }
        let features = fl.state().features();
        assert!(features.live);
        assert_eq!(features.columns.len(), 40);
        assert!(features.bands.bass > 0.1);
        assert!(fl.state().scene_frame().motion > 0.15);
        assert!((fl.element().current_time() - 1.5).abs() < 0.05);
    }

    #[test]
    fn test_play_without_track_stays_paused() {
        let mut fl = frame_loop(None);
        assert!(fl.play().is_ok());
        assert!(fl.element().paused());
    }

    #[test]
    fn test_seek_and_events() {
        let mut fl = frame_loop(Some(kick_track(2.0)));
        fl.play().unwrap();
        fl.step(1.0 / 60.0);
        assert!(fl.events().contains(&MediaEvent::Play));

        fl.input_mut().seek_start(1.5, 0.0);
        fl.step(1.0 / 60.0);
        assert!(fl
            .events()
            .iter()
            .any(|e| matches!(e, MediaEvent::Seeked { time } if (*time - 1.5).abs() < 1e-9)));

        // Runs off the end
        for _ in 0..60 {
            fl.step(1.0 / 60.0);
        }
        assert!(fl.element().paused());
        assert!(!fl.engine().is_running());
    }

    #[test]
    fn test_pause_suspends_context() {
        let mut fl = frame_loop(Some(kick_track(3.0)));
        fl.play().unwrap();
        assert!(fl.engine().is_running());

        fl.toggle().unwrap();
        assert!(fl.element().paused());
        assert!(!fl.engine().is_running());
        let t = fl.element().current_time();
        fl.step(1.0 / 60.0);
        assert_eq!(fl.element().current_time(), t);

        // Resumes the same graph
        fl.toggle().unwrap();
        assert!(!fl.element().paused());
        assert!(fl.engine().is_running());
        fl.step(1.0 / 60.0);
        assert!(fl.element().current_time() > t);

        fl.pause();
        assert!(!fl.engine().is_running());
    }

    #[test]
    fn test_huge_dt_is_clamped() {
        let mut fl = frame_loop(Some(kick_track(2.0)));
        fl.play().unwrap();
        fl.step(3.0);
        assert!((fl.t_now() - 0.05).abs() < 1e-6);
        assert!((fl.element().current_time() - 0.05).abs() < 1e-3);
    }
}
