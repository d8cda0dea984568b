//! Thread-safe player handle implementing the remote-control facade.

use crate::Player;
use jukebox_core::{
    AttrValue, FacadeError, FacadeResult, PlayerConfig, PlayerFacade, Track, TrackAttr, Volume,
    VolumeDelta,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to one player shared by the UI side and remote callers.
///
/// Every facade method takes the lock exactly once, so each call is atomic
/// with respect to every other call.
#[derive(Debug, Clone, Default)]
pub struct SharedPlayer {
    inner: Arc<Mutex<Player>>,
}

impl SharedPlayer {
    pub fn new(player: Player) -> Self {
        Self {
            inner: Arc::new(Mutex::new(player)),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(Player::with_settings(config.queue_sort(), config.volume()))
    }

    /// Lock the player for a compound operation.
    pub fn lock(&self) -> MutexGuard<'_, Player> {
        // A panic while holding the lock leaves the player in a consistent
        // state between calls, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlayerFacade for SharedPlayer {
    fn is_playing(&self) -> bool {
        self.lock().has_current()
    }

    fn track_attr(&self, attr: TrackAttr) -> Option<String> {
        let player = self.lock();
        if !player.has_current() {
            return None;
        }
        player.current().and_then(|item| item.track.attr(attr))
    }

    fn set_track_attr(&self, attr: TrackAttr, value: AttrValue) -> FacadeResult<()> {
        if !attr.is_settable() {
            return Err(FacadeError::Unsupported {
                operation: format!("set {attr}"),
            });
        }
        let mut player = self.lock();
        match (attr, value) {
            (TrackAttr::Rating, AttrValue::Rating(rating)) => {
                if player.set_rating(rating) {
                    tracing::debug!(%rating, "rated current track");
                    Ok(())
                } else {
                    Err(FacadeError::NotPlaying)
                }
            }
            (attr, _) => Err(FacadeError::Unsupported {
                operation: format!("set {attr}"),
            }),
        }
    }

    fn volume(&self) -> Volume {
        self.lock().volume()
    }

    fn set_volume(&self, volume: Volume) {
        self.lock().set_volume(volume);
    }

    fn change_volume(&self, delta: VolumeDelta) -> Volume {
        self.lock().adjust_volume(delta)
    }

    fn play(&self) {
        self.lock().play();
    }

    fn stop(&self) {
        self.lock().stop();
    }

    fn next(&self) {
        self.lock().skip_next();
    }

    fn prev(&self) {
        self.lock().skip_previous();
    }

    fn toggle_pause(&self) {
        self.lock().toggle_pause();
    }

    fn progress(&self) -> f64 {
        self.lock().progress()
    }

    fn enqueue(&self, tracks: Vec<Track>) {
        let count = tracks.len();
        if self.lock().enqueue(tracks).is_some() {
            tracing::info!(count, "enqueued tracks");
        }
    }

    fn play_tracks(&self, tracks: Vec<Track>) -> FacadeResult<()> {
        let mut player = self.lock();
        let first = player
            .queue_mut()
            .append_sorted(tracks)
            .into_iter()
            .next()
            .ok_or_else(|| FacadeError::Other {
                message: "no playable tracks".into(),
            })?;
        player.play_id(first);
        Ok(())
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}
