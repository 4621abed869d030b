//! Media element: a decoded track, its playback clock and playback events.
//!
//! The clock is shared with the output callback through atomics. With a live
//! output stream the callback advances it; in offline mode the frame loop
//! calls [`MediaElement::advance`] instead.

use crossbeam_channel::{unbounded, Receiver, Sender, TryIter};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::error::EngineError;

/// Seconds of media time between `TimeUpdate` events
const TIME_UPDATE_INTERVAL_S: f64 = 0.25;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded PCM track (interleaved, normalized to [-1, 1])
#[derive(Debug, Clone)]
pub struct Track {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl Track {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        // Drop a trailing partial frame
        let frames = samples.len() / channels as usize;
        let mut samples = samples;
        samples.truncate(frames * channels as usize);
        Self {
            samples,
            sample_rate: sample_rate.max(1),
            channels,
        }
    }

    /// Decode a WAV file (integer 8/16/24/32 bit or float)
    pub fn from_wav(path: &Path) -> Result<Self, EngineError> {
        let decode_err = |source| EngineError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let reader = hound::WavReader::open(path).map_err(decode_err)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(decode_err)?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(decode_err)?
            }
        };

        tracing::info!(
            "Decoded {}: {} Hz, {} ch, {:.1}s",
            path.display(),
            spec.sample_rate,
            spec.channels,
            samples.len() as f64 / (spec.sample_rate.max(1) as f64 * spec.channels.max(1) as f64)
        );

        Ok(Self::from_samples(samples, spec.sample_rate, spec.channels))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample of one channel; channels beyond the track's wrap around
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let ch = self.channels as usize;
        self.samples
            .get(frame * ch + channel % ch)
            .copied()
            .unwrap_or(0.0)
    }

    /// Channel average of one frame; 0 outside the track
    #[inline]
    pub fn mono(&self, frame: usize) -> f32 {
        let ch = self.channels as usize;
        match self.samples.get(frame * ch..frame * ch + ch) {
            Some(s) => s.iter().sum::<f32>() / ch as f32,
            None => 0.0,
        }
    }
}

/// Playback events, in the order a listener would observe them
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata { duration: f64 },
    Play,
    Pause,
    Ended,
    Seeked { time: f64 },
    TimeUpdate { time: f64 },
}

struct Subscriber {
    id: u64,
    tx: Sender<MediaEvent>,
}

type Registry = Mutex<Vec<Subscriber>>;

/// Owned event listener; detaches when dropped
pub struct Subscription {
    id: u64,
    rx: Receiver<MediaEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Events delivered since the last drain, without blocking
    pub fn try_iter(&self) -> TryIter<'_, MediaEvent> {
        self.rx.try_iter()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|s| s.id != self.id);
        }
    }
}

/// State shared with the audio callback
#[derive(Debug)]
pub(crate) struct Clock {
    /// Media time in seconds (f64 bits)
    position: AtomicU64,
    playing: AtomicBool,
    /// Set by whoever reaches the end; consumed by `MediaElement::update`
    ended: AtomicBool,
}

impl Clock {
    fn new() -> Self {
        Self {
            position: AtomicU64::new(0f64.to_bits()),
            playing: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        }
    }

    fn time(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    fn set_time(&self, t: f64) {
        self.position.store(t.to_bits(), Ordering::Release);
    }

    /// Advance from `from` unless someone else (a seek) moved the clock meanwhile
    fn try_advance(&self, from: f64, to: f64) {
        let _ = self.position.compare_exchange(
            from.to_bits(),
            to.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn finish(&self, duration: f64) {
        self.set_time(duration);
        self.playing.store(false, Ordering::Release);
        self.ended.store(true, Ordering::Release);
    }
}

/// Read side of an element handed to the audio graph
#[derive(Clone)]
pub struct PlaybackCursor {
    element: u64,
    track: Arc<Mutex<Option<Arc<Track>>>>,
    clock: Arc<Clock>,
}

impl PlaybackCursor {
    pub fn element_id(&self) -> u64 {
        self.element
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.time()
    }

    /// Snapshot of the current track, if any
    pub fn track(&self) -> Option<Arc<Track>> {
        self.track.lock().clone()
    }

    /// Fill an interleaved output buffer and advance the clock.
    ///
    /// Runs on the audio thread. `gain` is called once per output frame and
    /// returns the gain to apply. Outputs silence when paused or when the
    /// track is being swapped.
    pub fn render(
        &self,
        out: &mut [f32],
        out_channels: usize,
        out_rate: u32,
        mut gain: impl FnMut() -> f32,
    ) {
        out.fill(0.0);
        if !self.clock.is_playing() || out_channels == 0 || out_rate == 0 {
            return;
        }
        let Some(track) = self.track.try_lock().and_then(|t| t.clone()) else {
            return;
        };

        let start = self.clock.time();
        let dt = 1.0 / out_rate as f64;
        let sr = track.sample_rate() as f64;
        let frames = track.frames();

        let mut t = start;
        for frame in out.chunks_mut(out_channels) {
            let src = (t * sr) as usize;
            if src >= frames {
                self.clock.finish(track.duration());
                return;
            }
            let g = gain();
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = track.sample(src, c) * g;
            }
            t += dt;
        }
        self.clock.try_advance(start, t);
    }

    /// Mono window of `out.len()` source samples ending at the playback position
    pub fn window(&self, out: &mut [f32]) {
        out.fill(0.0);
        let Some(track) = self.track() else {
            return;
        };
        let end = (self.clock.time() * track.sample_rate() as f64) as i64;
        let start = end - out.len() as i64;
        for (i, s) in out.iter_mut().enumerate() {
            let frame = start + i as i64;
            if frame >= 0 {
                *s = track.mono(frame as usize);
            }
        }
    }
}

/// A playable source with a clock, transport controls and events
pub struct MediaElement {
    id: u64,
    track: Arc<Mutex<Option<Arc<Track>>>>,
    clock: Arc<Clock>,
    subscribers: Arc<Registry>,
    next_subscriber: u64,
    /// Set forever once an analysis source wraps this element
    bound: AtomicBool,
    last_time_update: f64,
}

impl Default for MediaElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement {
    pub fn new() -> Self {
        Self {
            id: NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed),
            track: Arc::new(Mutex::new(None)),
            clock: Arc::new(Clock::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscriber: 0,
            bound: AtomicBool::new(false),
            last_time_update: 0.0,
        }
    }

    pub fn with_track(track: Track) -> Self {
        let mut element = Self::new();
        element.load(track);
        element
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Replace the track. Playback stops and the clock rewinds.
    pub fn load(&mut self, track: Track) {
        let duration = track.duration();
        self.clock.playing.store(false, Ordering::Release);
        self.clock.ended.store(false, Ordering::Release);
        *self.track.lock() = Some(Arc::new(track));
        self.clock.set_time(0.0);
        self.last_time_update = 0.0;
        self.emit(MediaEvent::LoadedMetadata { duration });
    }

    pub fn has_track(&self) -> bool {
        self.track.lock().is_some()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.time()
    }

    /// Track length in seconds, 0 when nothing is loaded
    pub fn duration(&self) -> f64 {
        self.track.lock().as_ref().map_or(0.0, |t| t.duration())
    }

    pub fn paused(&self) -> bool {
        !self.clock.is_playing()
    }

    pub fn play(&mut self) -> Result<(), EngineError> {
        let duration = self.duration();
        if !self.has_track() {
            return Err(EngineError::NoTrack);
        }
        if self.clock.is_playing() {
            return Ok(());
        }
        if self.current_time() >= duration {
            self.clock.set_time(0.0);
        }
        self.clock.ended.store(false, Ordering::Release);
        self.clock.playing.store(true, Ordering::Release);
        self.emit(MediaEvent::Play);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.clock.playing.swap(false, Ordering::AcqRel) {
            self.emit(MediaEvent::Pause);
        }
    }

    pub fn toggle(&mut self) -> Result<(), EngineError> {
        if self.paused() {
            self.play()
        } else {
            self.pause();
            Ok(())
        }
    }

    /// Jump to `time` (clamped to the track)
    pub fn seek(&mut self, time: f64) {
        let duration = self.duration();
        let t = if time.is_finite() {
            time.clamp(0.0, duration)
        } else {
            0.0
        };
        self.clock.set_time(t);
        self.last_time_update = t;
        self.emit(MediaEvent::Seeked { time: t });
        self.emit(MediaEvent::TimeUpdate { time: t });
    }

    /// Advance the clock by `dt_s` when no output stream drives it
    pub fn advance(&mut self, dt_s: f64) {
        if !self.clock.is_playing() || !(dt_s > 0.0) {
            return;
        }
        let duration = self.duration();
        let t = self.clock.time() + dt_s;
        if t >= duration {
            self.clock.finish(duration);
        } else {
            self.clock.set_time(t);
        }
    }

    /// Per-frame housekeeping: delivers `Ended` and periodic `TimeUpdate`
    pub fn update(&mut self) {
        if self.clock.ended.swap(false, Ordering::AcqRel) {
            let t = self.clock.time();
            self.last_time_update = t;
            self.emit(MediaEvent::TimeUpdate { time: t });
            self.emit(MediaEvent::Pause);
            self.emit(MediaEvent::Ended);
            return;
        }
        if self.clock.is_playing() {
            let t = self.clock.time();
            if (t - self.last_time_update).abs() >= TIME_UPDATE_INTERVAL_S {
                self.last_time_update = t;
                self.emit(MediaEvent::TimeUpdate { time: t });
            }
        }
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = unbounded();
        self.next_subscriber += 1;
        let id = self.next_subscriber;
        self.subscribers.lock().push(Subscriber { id, tx });
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Wrap this element in an analysis source. Allowed once per element.
    pub fn bind_source(&self) -> Result<PlaybackCursor, EngineError> {
        if self.bound.swap(true, Ordering::AcqRel) {
            return Err(EngineError::GraphAlreadyBound { element: self.id });
        }
        Ok(self.cursor())
    }

    /// Read-only view of the playback state for the frame loop
    pub fn cursor(&self) -> PlaybackCursor {
        PlaybackCursor {
            element: self.id,
            track: Arc::clone(&self.track),
            clock: Arc::clone(&self.clock),
        }
    }

    fn emit(&self, event: MediaEvent) {
        let subscribers = self.subscribers.lock();
        for s in subscribers.iter() {
            let _ = s.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second_track() -> Track {
        Track::from_samples(vec![0.5; 1000], 1000, 1)
    }

    #[test]
    fn test_play_requires_track() {
        let mut element = MediaElement::new();
        assert!(matches!(element.play(), Err(EngineError::NoTrack)));
        assert!(element.paused());
    }

    #[test]
    fn test_events_reach_subscribers() {
        let mut element = MediaElement::with_track(one_second_track());
        let sub = element.subscribe();

        element.play().unwrap();
        element.seek(0.5);
        element.pause();

        assert_eq!(
            sub.try_iter().collect::<Vec<_>>(),
            vec![
                MediaEvent::Play,
                MediaEvent::Seeked { time: 0.5 },
                MediaEvent::TimeUpdate { time: 0.5 },
                MediaEvent::Pause,
            ]
        );
    }

    #[test]
    fn test_subscription_detaches_on_drop() {
        let mut element = MediaElement::with_track(one_second_track());
        let sub = element.subscribe();
        assert_eq!(element.subscriber_count(), 1);
        drop(sub);
        assert_eq!(element.subscriber_count(), 0);

        // Emitting with no listeners is fine
        element.play().unwrap();
    }

    #[test]
    fn test_offline_clock_reaches_end() {
        let mut element = MediaElement::with_track(one_second_track());
        let sub = element.subscribe();
        element.play().unwrap();

        for _ in 0..70 {
            element.advance(1.0 / 60.0);
            element.update();
        }

        assert!(element.paused());
        assert_eq!(element.current_time(), 1.0);
        let events = sub.try_iter().collect::<Vec<_>>();
        assert!(events.contains(&MediaEvent::Ended));

        // Playing again restarts from the top
        element.play().unwrap();
        assert_eq!(element.current_time(), 0.0);
    }

    #[test]
    fn test_bind_source_only_once() {
        let element = MediaElement::with_track(one_second_track());
        assert!(element.bind_source().is_ok());
        assert!(matches!(
            element.bind_source(),
            Err(EngineError::GraphAlreadyBound { .. })
        ));
    }

    #[test]
    fn test_render_advances_clock() {
        let mut element = MediaElement::with_track(one_second_track());
        let cursor = element.cursor();
        element.play().unwrap();

        let mut out = vec![0.0; 200]; // 100 stereo frames at 1 kHz
        cursor.render(&mut out, 2, 1000, || 0.5);

        assert!((element.current_time() - 0.1).abs() < 1e-9);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_paused_render_is_silent() {
        let element = MediaElement::with_track(one_second_track());
        let mut out = vec![1.0; 64];
        element.cursor().render(&mut out, 2, 1000, || 1.0);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(element.current_time(), 0.0);
    }

    #[test]
    fn test_window_pads_before_start() {
        let mut element = MediaElement::with_track(one_second_track());
        element.seek(0.01); // 10 samples in
        let mut buf = vec![9.0; 16];
        element.cursor().window(&mut buf);

        assert!(buf[..6].iter().all(|&s| s == 0.0));
        assert!(buf[6..].iter().all(|&s| s == 0.5));
    }
}
