use crate::{PlaybackClock, Queue, QueueId, QueueItem};
use jukebox_core::{QueueSort, Rating, Track, Volume, VolumeDelta, PROGRESS_UNKNOWN};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Stopped,
    Playing {
        id: QueueId,
    },
    Paused {
        id: QueueId,
    },
}

#[derive(Debug, Default)]
pub struct Player {
    queue: Queue,
    state: PlayerState,
    volume: Volume,
    clock: PlaybackClock,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(sort: QueueSort, volume: Volume) -> Self {
        Self {
            queue: Queue::with_sort(sort),
            volume,
            ..Self::default()
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Queue {
        &mut self.queue
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.queue.current()
    }

    /// A track is current, playing or paused.
    pub fn has_current(&self) -> bool {
        !matches!(self.state, PlayerState::Stopped)
    }

    /// Audio is actually advancing.
    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayerState::Playing { .. })
    }

    pub fn play(&mut self) -> Option<&QueueItem> {
        match self.state {
            PlayerState::Paused { .. } => {
                self.resume();
                self.queue.current()
            }
            PlayerState::Playing { .. } => self.queue.current(),
            PlayerState::Stopped => {
                if self.queue.current().is_none() {
                    self.queue.select_first()?;
                }
                self.start_current()
            }
        }
    }

    /// Jump to a queue entry and start it from the beginning.
    pub fn play_id(&mut self, id: QueueId) -> Option<&QueueItem> {
        self.queue.select_id(id)?;
        self.start_current()
    }

    pub fn pause(&mut self) -> bool {
        if let PlayerState::Playing { id } = self.state {
            self.state = PlayerState::Paused { id };
            self.clock.pause();
            return true;
        }
        false
    }

    pub fn resume(&mut self) -> bool {
        if let PlayerState::Paused { id } = self.state {
            self.state = PlayerState::Playing { id };
            self.clock.resume();
            return true;
        }
        false
    }

    /// Pause when playing, resume when paused, start when stopped.
    pub fn toggle_pause(&mut self) {
        match self.state {
            PlayerState::Playing { .. } => {
                self.pause();
            }
            PlayerState::Paused { .. } => {
                self.resume();
            }
            PlayerState::Stopped => {
                self.play();
            }
        }
    }

    pub fn stop(&mut self) {
        self.clock.reset();
        self.queue.reset_current();
        self.state = PlayerState::Stopped;
    }

    /// Move to the next entry; running off the end stops playback.
    pub fn skip_next(&mut self) -> Option<&QueueItem> {
        if self.queue.advance().is_none() {
            self.stop();
            return None;
        }
        self.start_current()
    }

    /// Move to the previous entry; at the start of the queue restart the current one.
    pub fn skip_previous(&mut self) -> Option<&QueueItem> {
        if self.queue.previous().is_none() && self.queue.current().is_none() {
            return None;
        }
        self.start_current()
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
    }

    pub fn adjust_volume(&mut self, delta: VolumeDelta) -> Volume {
        self.volume = delta.apply(self.volume);
        self.volume
    }

    /// Rate the current track. Returns false when nothing is current.
    pub fn set_rating(&mut self, rating: Rating) -> bool {
        if !self.has_current() {
            return false;
        }
        match self.queue.current_mut() {
            Some(item) => {
                item.track.rating = Some(rating);
                true
            }
            None => false,
        }
    }

    pub fn seek(&mut self, position: Duration) -> bool {
        if !self.has_current() {
            return false;
        }
        self.clock.seek(position);
        true
    }

    pub fn position(&self) -> Duration {
        self.clock.position()
    }

    /// Fraction of the current track played, or the unknown sentinel when
    /// stopped or the duration is not known.
    pub fn progress(&self) -> f64 {
        if !self.has_current() {
            return PROGRESS_UNKNOWN;
        }
        let duration = match self.current().and_then(|item| item.track.duration_seconds) {
            Some(secs) if secs > 0 => Duration::from_secs(u64::from(secs)),
            _ => return PROGRESS_UNKNOWN,
        };
        (self.clock.position().as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Append a batch in sort order and start its first track if nothing is playing.
    ///
    /// Returns the id of the first appended entry.
    pub fn enqueue(&mut self, tracks: Vec<Track>) -> Option<QueueId> {
        let first = self.queue.append_sorted(tracks).into_iter().next()?;
        if !self.is_playing() {
            self.play_id(first);
        }
        Some(first)
    }

    fn start_current(&mut self) -> Option<&QueueItem> {
        let id = self.queue.current().map(|item| item.id)?;
        self.state = PlayerState::Playing { id };
        self.clock.start();
        self.queue.current()
    }
}

#[cfg(test)]
mod tests {
    use jukebox_core::{SortColumn, TrackId, VolumeAction};

    use super::*;

    fn track(title: &str) -> Track {
        Track {
            id: TrackId::new(format!("/music/{title}.mp3")),
            title: title.to_string(),
            artists: vec!["artist".into()],
            album: None,
            duration_seconds: Some(200),
            track_number: None,
            rating: None,
        }
    }

    #[test]
    fn play_starts_first_track() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));

        let current = player.play().expect("should play first track");
        assert_eq!(current.track.title, "one");
        assert!(matches!(player.state(), PlayerState::Playing { .. }));
    }

    #[test]
    fn pause_and_resume_transitions() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.play();

        assert!(player.pause());
        assert!(matches!(player.state(), PlayerState::Paused { .. }));
        assert!(player.has_current());
        assert!(!player.is_playing());
        assert!(player.resume());
        assert!(matches!(player.state(), PlayerState::Playing { .. }));
    }

    #[test]
    fn toggle_pause_from_stopped_starts_playback() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.toggle_pause();
        assert!(player.is_playing());
        player.toggle_pause();
        assert!(matches!(player.state(), PlayerState::Paused { .. }));
    }

    #[test]
    fn skip_advances_queue_and_state() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.queue_mut().enqueue_back(track("two"));
        player.play();

        let next = player.skip_next().expect("should move to next track");
        assert_eq!(next.track.title, "two");
        assert!(matches!(player.state(), PlayerState::Playing { .. }));
        assert!(player.skip_next().is_none());
        assert_eq!(player.state(), &PlayerState::Stopped);
    }

    #[test]
    fn previous_restarts_first_track() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.queue_mut().enqueue_back(track("two"));
        player.play();
        player.seek(Duration::from_secs(100));

        let current = player.skip_previous().expect("first track restarts");
        assert_eq!(current.track.title, "one");
        assert!(player.position() < Duration::from_secs(100));
    }

    #[test]
    fn stop_clears_current_selection() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.play();

        player.stop();
        assert!(player.current().is_none());
        assert!(matches!(player.state(), PlayerState::Stopped));
        assert_eq!(player.progress(), PROGRESS_UNKNOWN);
    }

    #[test]
    fn progress_tracks_seek_position() {
        let mut player = Player::new();
        player.queue_mut().enqueue_back(track("one"));
        player.play();
        player.pause();
        player.seek(Duration::from_secs(50));
        assert!((player.progress() - 0.25).abs() < 1e-9);

        player.seek(Duration::from_secs(500));
        assert_eq!(player.progress(), 1.0);
    }

    #[test]
    fn progress_unknown_without_duration() {
        let mut player = Player::new();
        let mut stream = track("stream");
        stream.duration_seconds = None;
        player.queue_mut().enqueue_back(stream);
        player.play();
        assert_eq!(player.progress(), PROGRESS_UNKNOWN);
    }

    #[test]
    fn enqueue_starts_first_sorted_track_when_idle() {
        let mut player = Player::with_settings(
            QueueSort::new(SortColumn::Title, false),
            Volume::clamped(50),
        );
        player.enqueue(vec![track("b"), track("a")]);
        assert_eq!(player.current().map(|i| i.track.title.as_str()), Some("a"));

        player.enqueue(vec![track("c")]);
        assert_eq!(player.current().map(|i| i.track.title.as_str()), Some("a"));
        assert_eq!(player.queue().len(), 3);
    }

    #[test]
    fn enqueue_empty_batch_is_noop() {
        let mut player = Player::new();
        assert!(player.enqueue(Vec::new()).is_none());
        assert_eq!(player.state(), &PlayerState::Stopped);
    }

    #[test]
    fn rating_requires_current_track() {
        let mut player = Player::new();
        let rating = Rating::new(4).unwrap();
        assert!(!player.set_rating(rating));

        player.queue_mut().enqueue_back(track("one"));
        player.play();
        assert!(player.set_rating(rating));
        assert_eq!(player.current().and_then(|i| i.track.rating), Some(rating));
    }

    #[test]
    fn volume_adjustments_clamp() {
        let mut player = Player::with_settings(QueueSort::default(), Volume::clamped(95));
        let up = player.adjust_volume(VolumeDelta::new(VolumeAction::Increase, 10));
        assert_eq!(up.percent(), 100);
    }
}
