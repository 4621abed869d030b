//! Offline recording: drive the frame loop at a fixed rate and write PNG frames.

use std::time::Instant;

use image::RgbaImage;

use crate::audio::{AudioEngine, MediaElement, Track};
use crate::error::EngineError;
use crate::frame::{FrameLoop, Surfaces};
use crate::params::{EqConfig, RecordingConfig};
use crate::render::Canvas;

/// What a recording produced
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSummary {
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub beats: u64,
}

/// Stack the scene and spectrum canvases into one opaque image over black
pub fn compose_frame(surfaces: &Surfaces) -> RgbaImage {
    let scene = &surfaces.scene;
    let spectrum = &surfaces.spectrum;
    let width = scene.width().max(spectrum.width());
    let height = scene.height() + spectrum.height();
    let mut out = RgbaImage::new(width, height);

    for (canvas, y0) in [(scene, 0), (spectrum, scene.height())] {
        let w = canvas.width() as usize;
        for (i, px) in canvas.data().chunks_exact(4).enumerate() {
            let (x, y) = ((i % w) as u32, (i / w) as u32);
            // Premultiplied over black is just the colour channels
            out.put_pixel(x, y0 + y, image::Rgba([px[0], px[1], px[2], 255]));
        }
    }
    out
}

/// Render `track` for `rec.duration_secs` into numbered PNG frames
pub fn record(
    config: EqConfig,
    rec: &RecordingConfig,
    track: Track,
) -> Result<RecordSummary, EngineError> {
    let fps = rec.fps.max(1);
    let dt = 1.0 / fps as f32;
    // A clamped step would advance the media clock slower than the frame rate
    if config.render.clamp_dt(dt) != dt {
        return Err(EngineError::Config(format!(
            "{} fps is outside the recordable range {:.0}..={:.0}",
            fps,
            1.0 / config.render.max_dt_s,
            1.0 / config.render.min_dt_s
        )));
    }
    std::fs::create_dir_all(rec.frames_dir())?;

    let engine = AudioEngine::offline(config.analyser.clone());
    let element = MediaElement::with_track(track);
    let mut frame_loop = FrameLoop::new(
        config,
        engine,
        element,
        rec.width as f32,
        rec.height as f32,
        rec.dpr,
    )?;
    frame_loop.play()?;

    let total = rec.total_frames();
    let started = Instant::now();
    tracing::info!(
        "Recording {} frames ({:.1}s @ {} fps) to {}",
        total,
        rec.duration_secs,
        fps,
        rec.frames_dir()
    );

    let mut size = (0, 0);
    for frame in 0..total {
        frame_loop.step(dt);
        let image = compose_frame(frame_loop.surfaces());
        size = image.dimensions();
        image.save(rec.frame_path(frame))?;

        if (frame + 1) % fps as usize == 0 {
            tracing::info!(
                "  {}/{} frames ({:.1}s elapsed)",
                frame + 1,
                total,
                started.elapsed().as_secs_f32()
            );
        }
    }

    let beats = frame_loop.state().beat().count;
    frame_loop.dispose();
    tracing::info!("Recording complete: {} frames, {} beats", total, beats);

    Ok(RecordSummary {
        frames: total,
        width: size.0,
        height: size.1,
        beats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(seconds: f32) -> Track {
        let sr = 48000;
        let samples = (0..(seconds * sr as f32) as usize)
            .map(|i| (i as f32 / sr as f32 * 220.0 * std::f32::consts::TAU).sin() * 0.5)
            .collect();
        Track::from_samples(samples, sr, 1)
    }

    #[test]
    fn test_compose_stacks_canvases() {
        let mut surfaces = Surfaces::new(40.0, 20.0, 1.0, 0.5).unwrap();
        surfaces.scene.fill_rect(0.0, 0.0, 40.0, 10.0, crate::render::Ink::green(1.0));
        let image = compose_frame(&surfaces);
        assert_eq!(image.dimensions(), (40, 20));
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 65, 255]);
        assert_eq!(image.get_pixel(0, 15).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_record_writes_numbered_frames() {
        let dir = std::env::temp_dir().join(format!("eqwalker-record-{}", std::process::id()));
        let rec = RecordingConfig {
            duration_secs: 0.25,
            output_dir: dir.to_string_lossy().into_owned(),
            fps: 20,
            width: 64,
            height: 48,
            dpr: 1.0,
        };

        let summary = record(EqConfig::default(), &rec, tone(1.0)).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!((summary.width, summary.height), (64, 48));
        for i in 0..5 {
            assert!(std::path::Path::new(&rec.frame_path(i)).exists());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_record_rejects_slow_frame_rate() {
        let dir = std::env::temp_dir().join(format!("eqwalker-slow-{}", std::process::id()));
        let rec = RecordingConfig {
            duration_secs: 1.0,
            output_dir: dir.to_string_lossy().into_owned(),
            fps: 12,
            width: 32,
            height: 24,
            dpr: 1.0,
        };

        let err = record(EqConfig::default(), &rec, tone(1.0)).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(!dir.exists());
    }
}
