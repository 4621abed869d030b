//! Built-in demo track, synthesized with Glicol when no file is given.

use glicol::Engine;

use super::media::Track;
use crate::error::EngineError;

/// Glicol block size (samples per `next_block`)
pub const BLOCK_SIZE: usize = 128;

/// Default demo length (seconds)
pub const DEMO_SECONDS: f32 = 48.0;

/// Four-on-the-floor sine kick, a filtered saw bass line and a sparse lead
pub const DEMO_COMPOSITION: &str = r#"
~kgate: speed 4.0 >> seq 60 60 60 60
~kamp: ~kgate >> envperc 0.002 0.22
~kick: sin 55 >> mul ~kamp >> mul 0.7
~bgate: speed 2.0 >> seq 36 _36 43 _41
~bamp: ~bgate >> envperc 0.005 0.3
~bpit: ~bgate >> mul 261.63
~cut: sin 0.05 >> mul 500 >> add 800
~bass: saw ~bpit >> mul ~bamp >> lpf ~cut 2.0 >> mul 0.25
~n: choose 72 77 79 0
~lgate: speed 1.0 >> seq 72 _74 _~n 79
~lamp: ~lgate >> envperc 0.01 0.4
~lpit: ~lgate >> mul 261.63
~lead: saw ~lpit >> mul ~lamp >> lpf 2400.0 1.0 >> mul 0.05
o: mix ~kick ~bass ~lead >> plate 0.08
"#;

/// Render the demo composition to a stereo track
pub fn render_demo(sample_rate: u32, seconds: f32) -> Result<Track, EngineError> {
    let mut engine = Engine::<BLOCK_SIZE>::new();
    engine.set_sr(sample_rate as usize);
    engine.update_with_code(DEMO_COMPOSITION);
    engine
        .update()
        .map_err(|e| EngineError::Playback(format!("demo synth init failed: {:?}", e)))?;

    let frames = (seconds.max(0.0) * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(frames * 2);

    while samples.len() < frames * 2 {
        let (buffers, _) = engine.next_block(vec![]);
        let take = (frames - samples.len() / 2).min(BLOCK_SIZE);
        for i in 0..take {
            // Hard clip to ±0.5 for safe listening levels
            samples.push(buffers[0][i].clamp(-0.5, 0.5));
            samples.push(buffers[1][i].clamp(-0.5, 0.5));
        }
    }

    tracing::info!("Rendered {:.0}s demo track @ {}Hz", seconds, sample_rate);
    Ok(Track::from_samples(samples, sample_rate, 2))
}
