//! Error taxonomy for setup and IO boundaries.
//!
//! Per-frame code never returns these: extraction, envelopes, pose solving and
//! painting are total over their numeric domain.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Audio output host or device unavailable; the engine keeps running offline
    #[error("audio output unsupported: {0}")]
    Unsupported(String),

    /// A media element can feed at most one analysis source, ever
    #[error("media element {element} is already bound to an analysis graph")]
    GraphAlreadyBound { element: u64 },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("no track loaded")]
    NoTrack,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image output failed: {0}")]
    Image(#[from] image::ImageError),

    /// Window surface or GPU device could not be set up
    #[error("presentation failed: {0}")]
    Present(String),
}

impl EngineError {
    /// Transient failures reset playback to paused but leave the render loop running
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::Decode { .. } | EngineError::Playback(_) | EngineError::NoTrack
        )
    }
}
