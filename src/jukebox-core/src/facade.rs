//! The player capability the remote-control layer drives.
//!
//! The remote service never touches player internals directly; everything it
//! can do to a running player goes through [`PlayerFacade`].

use crate::models::{Rating, Track, TrackAttr, Volume, VolumeDelta};
use thiserror::Error;

/// Progress value reported when there is no meaningful playback position.
pub const PROGRESS_UNKNOWN: f64 = -1.0;

/// Failures a facade reports back to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FacadeError {
    #[error("nothing is playing")]
    NotPlaying,
    #[error("operation not supported: {operation}")]
    Unsupported { operation: String },
    #[error("invalid value for {attr}: {message}")]
    InvalidValue { attr: TrackAttr, message: String },
    #[error("{message}")]
    Other { message: String },
}

pub type FacadeResult<T> = Result<T, FacadeError>;

/// Value accepted when setting a track attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Rating(Rating),
}

/// Player operations exposed to remote callers.
///
/// Implementations must be safe to call from several threads at once;
/// [`PlayerFacade::change_volume`] in particular must not lose updates when
/// two callers adjust the volume concurrently.
pub trait PlayerFacade: Send + Sync {
    /// True while a track is current, whether playing or paused.
    fn is_playing(&self) -> bool;

    /// Attribute of the current track, `None` when nothing is current or the
    /// track has no value for it.
    fn track_attr(&self, attr: TrackAttr) -> Option<String>;

    fn set_track_attr(&self, attr: TrackAttr, value: AttrValue) -> FacadeResult<()>;

    fn volume(&self) -> Volume;

    fn set_volume(&self, volume: Volume);

    /// Apply a relative change as one atomic read-modify-write; returns the new level.
    fn change_volume(&self, delta: VolumeDelta) -> Volume;

    fn play(&self);

    fn stop(&self);

    fn next(&self);

    fn prev(&self);

    fn toggle_pause(&self);

    /// Position within the current track in `[0, 1]`, or [`PROGRESS_UNKNOWN`].
    fn progress(&self) -> f64;

    /// Append tracks to the active queue in its configured sort order and
    /// start the first of them when nothing is playing. Empty input is a no-op.
    fn enqueue(&self, tracks: Vec<Track>);

    /// Append tracks and start the first of them immediately.
    fn play_tracks(&self, tracks: Vec<Track>) -> FacadeResult<()> {
        let _ = tracks;
        Err(FacadeError::Unsupported {
            operation: "play_tracks".into(),
        })
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}
